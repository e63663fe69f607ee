//! # hand_pose
//!
//! The 21-keypoint hand model produced by landmark detectors (MediaPipe
//! numbering), and the reduction of one pose to the two quantities the
//! volume controller needs:
//!
//! * a **pinch distance** — thumb tip ↔ index tip, normalized by the span of
//!   the thumb and index bases so it does not depend on how far the hand is
//!   from the camera;
//! * a **finger state** — which of the five fingers are extended.
//!
//! ## Keypoint ids
//!
//! | Finger | Base (MCP) | Joints | Tip |
//! |---|---|---|---|
//! | Thumb  | 2  | 3      | 4  |
//! | Index  | 5  | 6, 7   | 8  |
//! | Middle | 9  | 10, 11 | 12 |
//! | Ring   | 13 | 14, 15 | 16 |
//! | Pinky  | 17 | 18, 19 | 20 |
//!
//! Id 0 is the wrist, id 1 the thumb CMC joint.
//!
//! ```rust
//! use hand_pose::{HandPose, Keypoint, ThumbSide, finger_state, pinch_distance};
//!
//! let pts: Vec<Keypoint> = (0..21).map(|id| Keypoint::new(id, 100 + id as i32, 300)).collect();
//! let pose = HandPose::new(pts).unwrap();
//! assert_eq!(finger_state(&pose, ThumbSide::Right).as_array().len(), 5);
//! assert!(pinch_distance(&pose, 1.0).is_ok());
//! ```

use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Keypoint ids
// ════════════════════════════════════════════════════════════════════════════

/// Number of keypoints in a well-formed hand pose.
pub const KEYPOINT_COUNT: usize = 21;

/// Named keypoint ids.
pub mod ids {
    pub const WRIST:      u8 = 0;
    pub const THUMB_CMC:  u8 = 1;
    pub const THUMB_MCP:  u8 = 2;
    pub const THUMB_IP:   u8 = 3;
    pub const THUMB_TIP:  u8 = 4;
    pub const INDEX_MCP:  u8 = 5;
    pub const INDEX_PIP:  u8 = 6;
    pub const INDEX_DIP:  u8 = 7;
    pub const INDEX_TIP:  u8 = 8;
    pub const MIDDLE_MCP: u8 = 9;
    pub const MIDDLE_PIP: u8 = 10;
    pub const MIDDLE_DIP: u8 = 11;
    pub const MIDDLE_TIP: u8 = 12;
    pub const RING_MCP:   u8 = 13;
    pub const RING_PIP:   u8 = 14;
    pub const RING_DIP:   u8 = 15;
    pub const RING_TIP:   u8 = 16;
    pub const PINKY_MCP:  u8 = 17;
    pub const PINKY_PIP:  u8 = 18;
    pub const PINKY_DIP:  u8 = 19;
    pub const PINKY_TIP:  u8 = 20;
}

/// Pairs of keypoint ids joined by a bone, for skeleton drawing.
pub const CONNECTIONS: [(u8, u8); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (17, 18), (18, 19), (19, 20),
    (0, 17),
];

// ════════════════════════════════════════════════════════════════════════════
// PoseError
// ════════════════════════════════════════════════════════════════════════════

/// Reasons a set of keypoints cannot be used as a hand pose.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoseError {
    #[error("expected {expected} keypoints, got {actual}")]
    WrongKeypointCount { expected: usize, actual: usize },

    #[error("keypoint id {0} is out of range 0–20")]
    IdOutOfRange(u8),

    #[error("keypoint id {0} appears more than once")]
    DuplicateId(u8),

    #[error("thumb base and index base coincide; pinch distance is undefined")]
    DegenerateBase,
}

// ════════════════════════════════════════════════════════════════════════════
// Keypoint
// ════════════════════════════════════════════════════════════════════════════

/// One detected landmark in pixel coordinates (origin top-left, y down).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Keypoint {
    pub id: u8,
    pub x:  i32,
    pub y:  i32,
}

impl Keypoint {
    pub fn new(id: u8, x: i32, y: i32) -> Self {
        Keypoint { id, x, y }
    }

    /// Build a keypoint from model-normalized coordinates (0.0–1.0 of the
    /// frame), truncating to whole pixels.
    pub fn from_normalized(id: u8, nx: f32, ny: f32, width: u32, height: u32) -> Self {
        Keypoint {
            id,
            x: (nx * width as f32) as i32,
            y: (ny * height as f32) as i32,
        }
    }

    /// Euclidean distance to another keypoint, in pixels.
    pub fn distance_to(&self, other: &Keypoint) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        dx.hypot(dy)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandPose
// ════════════════════════════════════════════════════════════════════════════

/// Exactly 21 keypoints for one hand, indexed by id.
///
/// Built either by [`HandPose::new`], which rejects partial or malformed
/// keypoint sets, or by [`HandPose::from_points`], which numbers a full
/// array itself; every reducer below may index freely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandPose {
    points: [Keypoint; KEYPOINT_COUNT],
}

impl HandPose {
    /// Validate and order a detector's keypoints.
    ///
    /// Keypoints may arrive in any order; each id 0–20 must appear exactly
    /// once.
    pub fn new(keypoints: Vec<Keypoint>) -> Result<Self, PoseError> {
        if keypoints.len() != KEYPOINT_COUNT {
            return Err(PoseError::WrongKeypointCount {
                expected: KEYPOINT_COUNT,
                actual:   keypoints.len(),
            });
        }

        let mut points = [Keypoint::default(); KEYPOINT_COUNT];
        let mut seen   = [false; KEYPOINT_COUNT];
        for kp in keypoints {
            let idx = kp.id as usize;
            if idx >= KEYPOINT_COUNT {
                return Err(PoseError::IdOutOfRange(kp.id));
            }
            if seen[idx] {
                return Err(PoseError::DuplicateId(kp.id));
            }
            seen[idx]   = true;
            points[idx] = kp;
        }
        Ok(HandPose { points })
    }

    /// Build a pose from pixel positions listed in id order.
    pub fn from_points(points: [(i32, i32); KEYPOINT_COUNT]) -> Self {
        let mut out = [Keypoint::default(); KEYPOINT_COUNT];
        for (id, (x, y)) in points.into_iter().enumerate() {
            out[id] = Keypoint::new(id as u8, x, y);
        }
        HandPose { points: out }
    }

    /// Keypoint by id.
    ///
    /// # Panics
    /// If `id` ≥ 21.
    pub fn get(&self, id: u8) -> &Keypoint {
        &self.points[id as usize]
    }

    pub fn keypoints(&self) -> &[Keypoint; KEYPOINT_COUNT] {
        &self.points
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Finger / FingerState
// ════════════════════════════════════════════════════════════════════════════

/// The five fingers, in the order used by [`FingerState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    /// Keypoint id of the fingertip.
    pub fn tip_id(self) -> u8 {
        match self {
            Finger::Thumb  => ids::THUMB_TIP,
            Finger::Index  => ids::INDEX_TIP,
            Finger::Middle => ids::MIDDLE_TIP,
            Finger::Ring   => ids::RING_TIP,
            Finger::Pinky  => ids::PINKY_TIP,
        }
    }

    /// Position in the [`FingerState`] vector.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb  => "thumb",
            Finger::Index  => "index",
            Finger::Middle => "middle",
            Finger::Ring   => "ring",
            Finger::Pinky  => "pinky",
        }
    }
}

/// Extended / not-extended flag per finger, ordered
/// `[thumb, index, middle, ring, pinky]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FingerState([bool; 5]);

impl FingerState {
    pub fn new(extended: [bool; 5]) -> Self {
        FingerState(extended)
    }

    /// All five fingers extended.
    pub fn open() -> Self {
        FingerState([true; 5])
    }

    /// No finger extended.
    pub fn fist() -> Self {
        FingerState([false; 5])
    }

    pub fn is_extended(&self, finger: Finger) -> bool {
        self.0[finger.index()]
    }

    pub fn set(&mut self, finger: Finger, extended: bool) {
        self.0[finger.index()] = extended;
    }

    pub fn toggle(&mut self, finger: Finger) {
        self.0[finger.index()] = !self.0[finger.index()];
    }

    /// Number of extended fingers (0–5).
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&e| e).count()
    }

    pub fn as_array(&self) -> [bool; 5] {
        self.0
    }
}

impl std::fmt::Display for FingerState {
    /// Renders as five digits, e.g. `11110`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for e in self.0 {
            write!(f, "{}", if e { '1' } else { '0' })?;
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ThumbSide — which lateral direction counts as "thumb out"
// ════════════════════════════════════════════════════════════════════════════

/// Lateral rule for the thumb-extension test.
///
/// The thumb is judged by comparing the x of its tip against the joint
/// below it, which only works for one hand/camera-mirroring combination.
/// `Right` is a right hand in a mirrored front-camera image (tip further
/// right than the IP joint when extended); `Left` flips the comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ThumbSide {
    #[default]
    Right,
    Left,
}

// ════════════════════════════════════════════════════════════════════════════
// Reducers
// ════════════════════════════════════════════════════════════════════════════

/// Normalized thumb/index pinch distance, ×100 and × `scale`, truncated.
///
/// Dividing by the thumb-base ↔ index-base span removes the dependence on
/// hand-to-camera distance.  Typical values lie around 40–220.
pub fn pinch_distance(pose: &HandPose, scale: f64) -> Result<u32, PoseError> {
    let tips = pose.get(ids::THUMB_TIP).distance_to(pose.get(ids::INDEX_TIP));
    let base = pose.get(ids::THUMB_MCP).distance_to(pose.get(ids::INDEX_MCP));
    if base == 0.0 {
        return Err(PoseError::DegenerateBase);
    }
    Ok((tips / base * 100.0 * scale) as u32)
}

/// Which fingers are extended.
///
/// * thumb: lateral test of tip (4) against IP joint (3), see [`ThumbSide`];
/// * other fingers: tip above (smaller y than) the joint two ids below it.
pub fn finger_state(pose: &HandPose, thumb_side: ThumbSide) -> FingerState {
    let mut state = FingerState::fist();

    let tip = pose.get(ids::THUMB_TIP);
    let ip  = pose.get(ids::THUMB_IP);
    let thumb_out = match thumb_side {
        ThumbSide::Right => tip.x > ip.x,
        ThumbSide::Left  => tip.x < ip.x,
    };
    state.set(Finger::Thumb, thumb_out);

    for finger in &Finger::ALL[1..] {
        let tip_id = finger.tip_id();
        let tip    = pose.get(tip_id);
        let pip    = pose.get(tip_id - 2);
        state.set(*finger, tip.y < pip.y);
    }
    state
}

/// Midpoint of the thumb and index tips (floor division).
pub fn pinch_center(pose: &HandPose) -> (i32, i32) {
    let a = pose.get(ids::THUMB_TIP);
    let b = pose.get(ids::INDEX_TIP);
    ((a.x + b.x).div_euclid(2), (a.y + b.y).div_euclid(2))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Every keypoint at the same spot, then overridden.
    fn pose_with(overrides: &[(u8, i32, i32)]) -> HandPose {
        let mut pts: Vec<Keypoint> = (0..21).map(|id| Keypoint::new(id, 500, 500)).collect();
        for &(id, x, y) in overrides {
            pts[id as usize] = Keypoint::new(id, x, y);
        }
        HandPose::new(pts).unwrap()
    }

    // ── HandPose validation ──────────────────────────────────────────────

    #[test]
    fn rejects_partial_hand() {
        let pts: Vec<Keypoint> = (0..20).map(|id| Keypoint::new(id, 0, 0)).collect();
        assert_eq!(
            HandPose::new(pts),
            Err(PoseError::WrongKeypointCount { expected: 21, actual: 20 })
        );
    }

    #[test]
    fn rejects_duplicate_and_out_of_range_ids() {
        let mut pts: Vec<Keypoint> = (0..21).map(|id| Keypoint::new(id, 0, 0)).collect();
        pts[20].id = 3;
        assert_eq!(HandPose::new(pts.clone()), Err(PoseError::DuplicateId(3)));
        pts[20].id = 21;
        assert_eq!(HandPose::new(pts), Err(PoseError::IdOutOfRange(21)));
    }

    #[test]
    fn keypoints_reordered_by_id() {
        let pts: Vec<Keypoint> = (0..21).rev().map(|id| Keypoint::new(id, id as i32, 0)).collect();
        let pose = HandPose::new(pts).unwrap();
        for id in 0..21u8 {
            assert_eq!(pose.get(id).x, id as i32);
        }
    }

    #[test]
    fn from_points_assigns_ids_in_order() {
        let mut pts = [(0, 0); KEYPOINT_COUNT];
        pts[ids::INDEX_TIP as usize] = (42, 7);
        let pose = HandPose::from_points(pts);
        assert_eq!(*pose.get(ids::INDEX_TIP), Keypoint::new(8, 42, 7));
    }

    #[test]
    fn from_normalized_truncates() {
        let kp = Keypoint::from_normalized(4, 0.5004, 0.2509, 1280, 720);
        assert_eq!((kp.x, kp.y), (640, 180));
    }

    // ── pinch_distance ───────────────────────────────────────────────────

    #[test]
    fn pinch_normalized_by_base_span() {
        // Base span 100 px, tip gap 150 px → 150.
        let pose = pose_with(&[
            (ids::THUMB_MCP, 0, 0),   (ids::INDEX_MCP, 100, 0),
            (ids::THUMB_TIP, 0, 200), (ids::INDEX_TIP, 150, 200),
        ]);
        assert_eq!(pinch_distance(&pose, 1.0), Ok(150));
    }

    #[test]
    fn pinch_invariant_to_hand_size() {
        let near = pose_with(&[
            (ids::THUMB_MCP, 0, 0),  (ids::INDEX_MCP, 60, 80),
            (ids::THUMB_TIP, 10, 10), (ids::INDEX_TIP, 70, 90),
        ]);
        let far = pose_with(&[
            (ids::THUMB_MCP, 0, 0),  (ids::INDEX_MCP, 30, 40),
            (ids::THUMB_TIP, 5, 5),  (ids::INDEX_TIP, 35, 45),
        ]);
        assert_eq!(pinch_distance(&near, 1.0), pinch_distance(&far, 1.0));
    }

    #[test]
    fn pinch_scaled_and_truncated() {
        // 1/3 of the base span → 33.33 → 33; ×2 → 66.
        let pose = pose_with(&[
            (ids::THUMB_MCP, 0, 0),  (ids::INDEX_MCP, 300, 0),
            (ids::THUMB_TIP, 0, 50), (ids::INDEX_TIP, 100, 50),
        ]);
        assert_eq!(pinch_distance(&pose, 1.0), Ok(33));
        assert_eq!(pinch_distance(&pose, 2.0), Ok(66));
    }

    #[test]
    fn pinch_degenerate_base() {
        let pose = pose_with(&[(ids::THUMB_TIP, 0, 0), (ids::INDEX_TIP, 10, 0)]);
        assert_eq!(pinch_distance(&pose, 1.0), Err(PoseError::DegenerateBase));
    }

    // ── finger_state ─────────────────────────────────────────────────────

    #[test]
    fn fingers_above_pip_are_extended() {
        let pose = pose_with(&[
            (ids::THUMB_TIP, 520, 400), (ids::THUMB_IP, 510, 420),
            (ids::INDEX_TIP, 500, 300), (ids::INDEX_PIP, 500, 400),
            (ids::MIDDLE_TIP, 500, 450), (ids::MIDDLE_PIP, 500, 400),
            (ids::RING_TIP, 500, 300),  (ids::RING_PIP, 500, 400),
            (ids::PINKY_TIP, 500, 450), (ids::PINKY_PIP, 500, 400),
        ]);
        let fs = finger_state(&pose, ThumbSide::Right);
        assert_eq!(fs.as_array(), [true, true, false, true, false]);
        assert_eq!(fs.count(), 3);
        assert_eq!(fs.to_string(), "11010");
    }

    #[test]
    fn equal_y_is_not_extended() {
        let fs = finger_state(&pose_with(&[]), ThumbSide::Right);
        assert_eq!(fs, FingerState::fist());
    }

    #[test]
    fn thumb_side_flips_lateral_test() {
        let pose = pose_with(&[(ids::THUMB_TIP, 400, 500), (ids::THUMB_IP, 450, 500)]);
        assert!(!finger_state(&pose, ThumbSide::Right).is_extended(Finger::Thumb));
        assert!( finger_state(&pose, ThumbSide::Left ).is_extended(Finger::Thumb));
    }

    #[test]
    fn pinch_center_floors() {
        let pose = pose_with(&[(ids::THUMB_TIP, 1, 3), (ids::INDEX_TIP, 4, 8)]);
        assert_eq!(pinch_center(&pose), (2, 5));
    }

    #[test]
    fn finger_state_toggle() {
        let mut fs = FingerState::fist();
        fs.toggle(Finger::Ring);
        assert!(fs.is_extended(Finger::Ring));
        assert_eq!(fs.count(), 1);
        fs.toggle(Finger::Ring);
        assert_eq!(fs, FingerState::fist());
    }

    proptest! {
        #[test]
        fn finger_state_always_five(coords in prop::collection::vec((0i32..1920, 0i32..1080), 21)) {
            let pts = coords.iter().enumerate()
                .map(|(id, &(x, y))| Keypoint::new(id as u8, x, y))
                .collect();
            let pose = HandPose::new(pts).unwrap();
            let fs = finger_state(&pose, ThumbSide::Right);
            prop_assert_eq!(fs.as_array().len(), 5);
            prop_assert!(fs.count() <= 5);
        }
    }
}
