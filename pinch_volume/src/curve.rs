//! The mixer's native loudness curve.
//!
//! [`NATIVE_LEVELS`] holds 101 empirically sampled native levels (decibel-like
//! units), one per integer percent, as reported by a Windows endpoint-volume
//! mixer after setting the matching linear scalar.  It is a data asset: it is
//! specific to that mixer API and must be re-sampled for another platform.

use crate::level::VolumeLevel;

/// Native mixer level for each percent `0..=100`.  Strictly increasing.
#[allow(clippy::excessive_precision)]
pub const NATIVE_LEVELS: [f32; 101] = [
    -50.0,        -45.62559509, -42.23281097, -39.46084976, -37.11726761,
    -35.08721542, -33.29661942, -31.69490242, -30.24598885, -28.92324829,
    -27.70645523, -26.5798893,  -25.53108788, -24.55000496, -23.62842369,
    -22.75953674, -21.93764496, -21.15792084, -20.41625023, -19.70909309,
    -19.03337479, -18.38642311, -17.7658844,  -17.16968918, -16.59599876,
    -16.04317474, -15.50975323, -14.99441719, -14.49598217, -14.01337337,
    -13.54561615, -13.09182644, -12.65119171, -12.22297001, -11.80648327,
    -11.40110493, -11.0062561,  -10.62140656, -10.24606037, -9.879759789,
    -9.52207756,  -9.172620773, -8.831016541, -8.496921539, -8.17001152,
    -7.8499856,   -7.536557674, -7.2294631,   -6.928450108, -6.633281708,
    -6.343736649, -6.059604168, -5.780685902, -5.506793022, -5.237746716,
    -4.973381519, -4.713535786, -4.458057404, -4.206802368, -3.959632635,
    -3.716416597, -3.477032423, -3.241359711, -3.009285212, -2.780700922,
    -2.55550313,  -2.333591938, -2.114875078, -1.899260759, -1.686662078,
    -1.476996064, -1.270182729, -1.066144347, -0.864809752, -0.666107118,
    -0.469968468, -0.276328534, -0.085124426,  0.104416773,  0.2958664,
     0.489757001,  0.686152756,  0.885119379,  1.086724877,  1.291040421,
     1.498140931,  1.708100915,  1.921001673,  2.136926889,  2.355963469,
     2.578202724,  2.803740978,  3.032674551,  3.265109062,  3.501152992,
     3.740920544,  3.984530687,  4.2321105,    4.483787537,  4.739702702,
     5.0,
];

/// Native level the mixer reports once `level` has been applied.
pub fn native_for_level(level: VolumeLevel) -> f32 {
    NATIVE_LEVELS[level.percent() as usize]
}

/// Native level for an arbitrary linear scalar, interpolating between the
/// sampled percents.  `scalar` is clamped to `[0, 1]`.
pub fn native_for_scalar(scalar: f32) -> f32 {
    let pos = (scalar.clamp(0.0, 1.0) as f64) * 100.0;
    // 0.29 * 100 lands a hair below 29; snap to the sample.
    let snapped = pos.round();
    if (pos - snapped).abs() < 1e-3 {
        return NATIVE_LEVELS[snapped as usize];
    }
    let i    = pos.floor() as usize;
    let frac = (pos - i as f64) as f32;
    NATIVE_LEVELS[i] + frac * (NATIVE_LEVELS[i + 1] - NATIVE_LEVELS[i])
}

/// Whether two native levels agree to two decimal places.
pub(crate) fn same_hundredths(a: f32, b: f32) -> bool {
    let h = |v: f32| (v as f64 * 100.0).round() as i64;
    h(a) == h(b)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::quantize;

    #[test]
    fn endpoints() {
        assert_eq!(native_for_level(VolumeLevel::MUTE), -50.0);
        assert_eq!(native_for_level(VolumeLevel::MAX),  5.0);
    }

    #[test]
    fn strictly_increasing() {
        for w in NATIVE_LEVELS.windows(2) {
            assert!(w[0] < w[1], "{} !< {}", w[0], w[1]);
        }
    }

    #[test]
    fn scalar_hits_samples() {
        for p in 0..=100u8 {
            let level = quantize(p as i64);
            assert!(same_hundredths(native_for_scalar(level.scalar()), native_for_level(level)));
        }
        assert_eq!(native_for_scalar(0.29), NATIVE_LEVELS[29]);
    }

    #[test]
    fn scalar_interpolates_between_samples() {
        let mid = native_for_scalar(0.005);
        assert!(mid > NATIVE_LEVELS[0] && mid < NATIVE_LEVELS[1]);
    }

    #[test]
    fn scalar_clamped() {
        assert_eq!(native_for_scalar(-1.0), -50.0);
        assert_eq!(native_for_scalar(2.0),  5.0);
    }

    #[test]
    fn hundredths_comparison() {
        assert!( same_hundredths(-6.633281708, -6.63));
        assert!(!same_hundredths(-6.633281708, -6.64));
    }
}
