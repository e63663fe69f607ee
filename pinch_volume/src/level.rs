//! Volume levels and the distance → level mapping.

use std::fmt;

// ════════════════════════════════════════════════════════════════════════════
// VolumeLevel
// ════════════════════════════════════════════════════════════════════════════

/// Granularity of every [`VolumeLevel`], in percent.
pub const STEP: u8 = 5;

/// A volume percentage in `0..=100` that is always a multiple of [`STEP`].
///
/// Single-pixel landmark noise moves the raw percentage by a point or two;
/// flooring to steps of five keeps that noise from reaching the mixer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VolumeLevel(u8);

impl VolumeLevel {
    pub const MUTE: VolumeLevel = VolumeLevel(0);
    pub const MAX:  VolumeLevel = VolumeLevel(100);

    /// Floor an integer percentage to a multiple of 5, clamped to `0..=100`.
    pub fn quantize(percent: i64) -> Self {
        let stepped = percent.div_euclid(STEP as i64) * STEP as i64;
        VolumeLevel(stepped.clamp(0, 100) as u8)
    }

    /// Floor a fractional percentage (as produced by interpolation).
    pub fn from_raw(percent: f64) -> Self {
        if percent.is_nan() {
            return VolumeLevel::MUTE;
        }
        let stepped = (percent / STEP as f64).floor() * STEP as f64;
        VolumeLevel(stepped.clamp(0.0, 100.0) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// The level on the mixer's linear `[0, 1]` scalar scale.
    pub fn scalar(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl fmt::Display for VolumeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Floor `percent` to the nearest lower multiple of 5 (clamped to 0–100).
pub fn quantize(percent: i64) -> VolumeLevel {
    VolumeLevel::quantize(percent)
}

// ════════════════════════════════════════════════════════════════════════════
// DistanceRange
// ════════════════════════════════════════════════════════════════════════════

/// The usable span of pinch distances; everything outside is clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistanceRange {
    pub low:  u32,
    pub high: u32,
}

impl DistanceRange {
    /// Empirical bounds at display scale 1.
    pub const DEFAULT_LOW:  u32 = 60;
    pub const DEFAULT_HIGH: u32 = 190;

    pub fn new(low: u32, high: u32) -> Self {
        DistanceRange { low, high }
    }

    /// Default bounds multiplied by the display scale factor, truncated.
    pub fn scaled(scale: f64) -> Self {
        DistanceRange::new(Self::DEFAULT_LOW, Self::DEFAULT_HIGH).scale(scale)
    }

    /// These bounds multiplied by `scale`, truncated.
    pub fn scale(self, scale: f64) -> Self {
        DistanceRange {
            low:  (self.low  as f64 * scale) as u32,
            high: (self.high as f64 * scale) as u32,
        }
    }
}

impl Default for DistanceRange {
    fn default() -> Self {
        DistanceRange::new(Self::DEFAULT_LOW, Self::DEFAULT_HIGH)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Mapping
// ════════════════════════════════════════════════════════════════════════════

/// Linear interpolation of `distance` from `range` onto `[from, to]`,
/// clamped at both edges (`from` at or below `range.low`, `to` at or above
/// `range.high`).
pub fn interpolate(distance: u32, range: DistanceRange, from: f64, to: f64) -> f64 {
    if distance <= range.low {
        return from;
    }
    if distance >= range.high {
        return to;
    }
    let t = (distance - range.low) as f64 / (range.high - range.low) as f64;
    from + t * (to - from)
}

/// Map a pinch distance to a quantized volume level.
///
/// `range.low` and below → 0 %, `range.high` and above → 100 %, linear in
/// between, then floored to a multiple of 5.
pub fn map_distance_to_level(distance: u32, range: DistanceRange) -> VolumeLevel {
    VolumeLevel::from_raw(interpolate(distance, range, 0.0, 100.0))
}

/// Map a pinch distance onto the pixel span of an on-screen volume bar.
///
/// `bottom` is the y of an empty bar and `top` the y of a full one.
pub fn map_distance_to_bar(distance: u32, range: DistanceRange, bottom: i32, top: i32) -> i32 {
    interpolate(distance, range, bottom as f64, top as f64) as i32
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn low_edge_maps_to_zero() {
        let r = DistanceRange::default();
        assert_eq!(map_distance_to_level(60, r), VolumeLevel::MUTE);
        assert_eq!(map_distance_to_level(0, r),  VolumeLevel::MUTE);
    }

    #[test]
    fn high_edge_maps_to_hundred() {
        let r = DistanceRange::default();
        assert_eq!(map_distance_to_level(190, r), VolumeLevel::MAX);
        assert_eq!(map_distance_to_level(400, r), VolumeLevel::MAX);
    }

    #[test]
    fn midpoint_maps_to_fifty() {
        assert_eq!(map_distance_to_level(125, DistanceRange::default()).percent(), 50);
    }

    #[test]
    fn interior_values_floor_to_step() {
        let r = DistanceRange::default();
        // 70 → 7.69 → 5;  100 → 30.77 → 30;  189 → 99.2 → 95
        assert_eq!(map_distance_to_level(70,  r).percent(), 5);
        assert_eq!(map_distance_to_level(100, r).percent(), 30);
        assert_eq!(map_distance_to_level(189, r).percent(), 95);
    }

    #[test]
    fn scaled_range_truncates() {
        assert_eq!(DistanceRange::scaled(1.5), DistanceRange::new(90, 285));
        assert_eq!(DistanceRange::scaled(0.75), DistanceRange::new(45, 142));
    }

    #[test]
    fn quantize_clamps_and_floors() {
        assert_eq!(quantize(-3).percent(),  0);
        assert_eq!(quantize(23).percent(),  20);
        assert_eq!(quantize(25).percent(),  25);
        assert_eq!(quantize(250).percent(), 100);
    }

    #[test]
    fn bar_runs_bottom_to_top() {
        let r = DistanceRange::default();
        assert_eq!(map_distance_to_bar(10,  r, 400, 150), 400);
        assert_eq!(map_distance_to_bar(125, r, 400, 150), 275);
        assert_eq!(map_distance_to_bar(300, r, 400, 150), 150);
    }

    #[test]
    fn display_has_percent_sign() {
        assert_eq!(quantize(45).to_string(), "45%");
    }

    proptest! {
        #[test]
        fn level_is_stepped_and_bounded(d in 0u32..10_000) {
            let p = map_distance_to_level(d, DistanceRange::default()).percent();
            prop_assert!(p <= 100);
            prop_assert_eq!(p % 5, 0);
        }

        #[test]
        fn level_is_monotone(a in 0u32..400, b in 0u32..400) {
            let r = DistanceRange::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(map_distance_to_level(lo, r) <= map_distance_to_level(hi, r));
        }

        #[test]
        fn quantize_is_idempotent(x in any::<i32>()) {
            let once = quantize(x as i64);
            prop_assert_eq!(quantize(once.percent() as i64), once);
        }
    }
}
