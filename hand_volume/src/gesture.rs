//! Landmark sources — where hand poses come from each frame.
//!
//! The frame loop only sees [`LandmarkSource::detect`]; it does not know
//! whether the hands were synthesized from the keyboard and mouse or read
//! from a detector process.
//!
//! * [`SimLandmarkSource`] builds a right hand from [`SimInput`] events sent
//!   by the visualizer window.
//! * [`JsonLinesSource`] reads one JSON detection per line, e.g. piped from
//!   a MediaPipe script:
//!
//! ```text
//! {"hands":[{"score":0.97,"landmarks":[[0.51,0.83],[0.55,0.79], … 21 points]}]}
//! ```
//!
//! Landmark coordinates are normalized to the frame (0.0–1.0) and may carry
//! a third (depth) value, which is ignored.

use std::io::{self, BufRead};
use std::sync::mpsc::{Receiver, TryRecvError};

use hand_pose::{Finger, FingerState, HandPose, KEYPOINT_COUNT, Keypoint};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait — unified interface for sim and detector streams
// ════════════════════════════════════════════════════════════════════════════

/// What a source produced for one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Detection {
    /// Zero or more hands, most confident first.
    Hands(Vec<HandPose>),
    /// The source has no more frames (end of stream, or quit requested).
    Finished,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read landmark stream: {0}")]
    Io(#[from] io::Error),

    #[error("malformed landmark record on line {line}: {source}")]
    Parse {
        line:   usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that can deliver per-frame hand detections.
pub trait LandmarkSource {
    fn detect(&mut self) -> Result<Detection, SourceError>;

    /// Short label for logs and the status bar.
    fn name(&self) -> &'static str;
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource — keyboard/mouse simulation
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    Key(SimKey),
    /// Mouse moved; the hand follows it.
    PointerMoved { x: i32, y: i32 },
}

/// Simulated key codes (mapped from minifb keys).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    PinchWider,            // Up
    PinchNarrower,         // Down
    ToggleFinger(Finger),  // 1–5
    VolumePose,            // V — four fingers up, pinky down
    Fist,                  // F
    OpenHand,              // O
    ToggleHand,            // H — hand enters / leaves the frame
    Quit,                  // Q / Escape
}

/// Pinch change per key repeat, in normalized pinch units.
const PINCH_STEP: u32 = 5;
const PINCH_MAX:  u32 = 300;

/// The simulated hand's controllable state.
#[derive(Clone, Debug, PartialEq)]
pub struct SimHand {
    pub visible: bool,
    /// Wrist position in pixels.
    pub wrist:   (i32, i32),
    /// Target pinch distance at scale 1 (tip gap / base span × 100).
    pub pinch:   u32,
    pub fingers: FingerState,
    /// Bone length unit in pixels.
    pub size:    f64,
}

impl SimHand {
    /// A hand in the volume pose, wrist below the middle of the frame.
    pub fn centered(width: u32, height: u32, scale: f64) -> Self {
        SimHand {
            visible: true,
            wrist:   (width as i32 / 2, (height as f64 * 0.8) as i32),
            pinch:   125,
            fingers: volume_pose(),
            size:    60.0 * scale,
        }
    }

    pub fn apply(&mut self, key: SimKey) {
        match key {
            SimKey::PinchWider      => self.pinch = (self.pinch + PINCH_STEP).min(PINCH_MAX),
            SimKey::PinchNarrower   => self.pinch = self.pinch.saturating_sub(PINCH_STEP),
            SimKey::ToggleFinger(f) => self.fingers.toggle(f),
            SimKey::VolumePose      => self.fingers = volume_pose(),
            SimKey::Fist            => self.fingers = FingerState::fist(),
            SimKey::OpenHand        => self.fingers = FingerState::open(),
            SimKey::ToggleHand      => self.visible = !self.visible,
            SimKey::Quit            => {}
        }
    }
}

fn volume_pose() -> FingerState {
    FingerState::new([true, true, true, true, false])
}

/// Gesture source driven by [`SimInput`] events from the visualizer window.
///
/// Events are drained without blocking at the start of every frame.
pub struct SimLandmarkSource {
    rx:   Receiver<SimInput>,
    hand: SimHand,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>, hand: SimHand) -> Self {
        SimLandmarkSource { rx, hand }
    }

    pub fn hand(&self) -> &SimHand { &self.hand }
}

impl LandmarkSource for SimLandmarkSource {
    fn detect(&mut self) -> Result<Detection, SourceError> {
        loop {
            match self.rx.try_recv() {
                Ok(SimInput::Key(SimKey::Quit))         => return Ok(Detection::Finished),
                Ok(SimInput::Key(key))                  => self.hand.apply(key),
                Ok(SimInput::PointerMoved { x, y })     => self.hand.wrist = (x, y),
                Err(TryRecvError::Empty)                => break,
                Err(TryRecvError::Disconnected)         => return Ok(Detection::Finished),
            }
        }

        if self.hand.visible {
            Ok(Detection::Hands(vec![synthetic_hand(&self.hand)]))
        } else {
            Ok(Detection::Hands(Vec::new()))
        }
    }

    fn name(&self) -> &'static str { "simulation" }
}

/// Lay out 21 keypoints for a right hand seen by a mirrored camera.
///
/// Extended fingers point straight up from their base; curled fingers fold
/// their tip back below the PIP joint.  The thumb tip is placed down-right
/// of the index tip at the distance that yields `hand.pinch`, and its IP
/// joint sits on the side that makes the lateral thumb test agree with
/// `hand.fingers`.
pub fn synthetic_hand(hand: &SimHand) -> HandPose {
    let s = hand.size;
    let (wx, wy) = (hand.wrist.0 as f64, hand.wrist.1 as f64);
    let at = |dx: f64, dy: f64| (wx + dx * s, wy + dy * s);

    let wrist     = at(0.0, 0.0);
    let thumb_cmc = at(0.8, -0.6);
    let thumb_mcp = at(1.4, -1.3);
    let index_mcp = at(0.6, -2.3);
    let mid_mcp   = at(0.05, -2.4);
    let ring_mcp  = at(-0.45, -2.25);
    let pinky_mcp = at(-0.9, -1.95);

    let index  = finger_chain(index_mcp, hand.fingers.is_extended(Finger::Index),  s);
    let middle = finger_chain(mid_mcp,   hand.fingers.is_extended(Finger::Middle), s * 1.1);
    let ring   = finger_chain(ring_mcp,  hand.fingers.is_extended(Finger::Ring),   s);
    let pinky  = finger_chain(pinky_mcp, hand.fingers.is_extended(Finger::Pinky),  s * 0.8);

    let base_span = (index_mcp.0 - thumb_mcp.0).hypot(index_mcp.1 - thumb_mcp.1);
    let gap       = hand.pinch as f64 / 100.0 * base_span;
    let index_tip = index[2];
    let thumb_tip = (index_tip.0 + 0.6 * gap, index_tip.1 + 0.8 * gap);
    let side      = if hand.fingers.is_extended(Finger::Thumb) { -0.35 } else { 0.35 };
    let thumb_ip  = (thumb_tip.0 + side * s, thumb_tip.1 + 0.35 * s);

    let pts = [
        wrist, thumb_cmc, thumb_mcp, thumb_ip, thumb_tip,
        index_mcp,  index[0],  index[1],  index[2],
        mid_mcp,    middle[0], middle[1], middle[2],
        ring_mcp,   ring[0],   ring[1],   ring[2],
        pinky_mcp,  pinky[0],  pinky[1],  pinky[2],
    ];
    HandPose::from_points(pts.map(|(x, y)| (x.round() as i32, y.round() as i32)))
}

/// PIP, DIP and tip positions above a finger base.
fn finger_chain(mcp: (f64, f64), extended: bool, len: f64) -> [(f64, f64); 3] {
    let at = |dx: f64, dy: f64| (mcp.0 + dx * len, mcp.1 + dy * len);
    if extended {
        [at(0.0, -0.9), at(0.0, -1.55), at(0.0, -2.1)]
    } else {
        [at(0.0, -0.8), at(0.15, -0.55), at(0.1, -0.25)]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesSource — detections streamed from an external detector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct FrameRecord {
    #[serde(default)]
    hands: Vec<HandRecord>,
}

#[derive(Deserialize, Debug)]
struct HandRecord {
    #[serde(default = "full_confidence")]
    score:     f32,
    landmarks: Vec<Vec<f32>>,
}

fn full_confidence() -> f32 { 1.0 }

/// Reads one JSON detection per line from any buffered reader.
pub struct JsonLinesSource<R: BufRead> {
    reader:         R,
    line_no:        usize,
    frame_width:    u32,
    frame_height:   u32,
    max_hands:      usize,
    min_confidence: f32,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R, frame_size: (u32, u32), max_hands: usize, min_confidence: f32) -> Self {
        JsonLinesSource {
            reader,
            line_no: 0,
            frame_width:  frame_size.0,
            frame_height: frame_size.1,
            max_hands,
            min_confidence,
        }
    }

    /// Convert one hand record, or `None` if it is not a full 21-point hand.
    fn to_pose(&self, hand: &HandRecord) -> Option<HandPose> {
        if hand.landmarks.len() != KEYPOINT_COUNT {
            debug!(line = self.line_no, points = hand.landmarks.len(), "skipping partial hand");
            return None;
        }
        let mut keypoints = Vec::with_capacity(KEYPOINT_COUNT);
        for (id, lm) in hand.landmarks.iter().enumerate() {
            let (nx, ny) = match lm.as_slice() {
                [x, y, ..] => (*x, *y),
                _ => {
                    debug!(line = self.line_no, id, "skipping hand with a malformed landmark");
                    return None;
                }
            };
            keypoints.push(Keypoint::from_normalized(
                id as u8, nx, ny, self.frame_width, self.frame_height,
            ));
        }
        match HandPose::new(keypoints) {
            Ok(pose) => Some(pose),
            Err(e) => {
                debug!(line = self.line_no, error = %e, "skipping invalid hand");
                None
            }
        }
    }
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn detect(&mut self) -> Result<Detection, SourceError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(Detection::Finished);
            }
            self.line_no += 1;
            if !line.trim().is_empty() {
                break;
            }
        }

        let record: FrameRecord = serde_json::from_str(line.trim())
            .map_err(|source| SourceError::Parse { line: self.line_no, source })?;

        let hands = record.hands.iter()
            .filter(|h| h.score >= self.min_confidence)
            .take(self.max_hands)
            .filter_map(|h| self.to_pose(h))
            .collect();
        Ok(Detection::Hands(hands))
    }

    fn name(&self) -> &'static str { "landmark stream" }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_pose::{ThumbSide, finger_state, pinch_distance};
    use std::io::Cursor;
    use std::sync::mpsc;

    fn hand_with(fingers: FingerState, pinch: u32) -> SimHand {
        SimHand { fingers, pinch, ..SimHand::centered(1280, 720, 1.0) }
    }

    // ── synthetic_hand ───────────────────────────────────────────────────

    #[test]
    fn synthetic_fingers_match_request() {
        let cases = [
            FingerState::open(),
            FingerState::fist(),
            volume_pose(),
            FingerState::new([false, true, false, true, false]),
            FingerState::new([true, false, false, false, true]),
        ];
        for fs in cases {
            let pose = synthetic_hand(&hand_with(fs, 100));
            assert_eq!(finger_state(&pose, ThumbSide::Right), fs);
        }
    }

    #[test]
    fn synthetic_pinch_close_to_request() {
        for pinch in [0u32, 60, 125, 190, 250] {
            let pose = synthetic_hand(&hand_with(volume_pose(), pinch));
            let got = pinch_distance(&pose, 1.0).unwrap() as i64;
            assert!((got - pinch as i64).abs() <= 2, "requested {} got {}", pinch, got);
        }
    }

    #[test]
    fn sim_hand_keys() {
        let mut hand = SimHand::centered(1280, 720, 1.0);
        hand.apply(SimKey::PinchWider);
        assert_eq!(hand.pinch, 130);
        hand.apply(SimKey::Fist);
        assert_eq!(hand.fingers.count(), 0);
        hand.apply(SimKey::ToggleFinger(Finger::Pinky));
        assert!(hand.fingers.is_extended(Finger::Pinky));
        hand.apply(SimKey::ToggleHand);
        assert!(!hand.visible);
        hand.pinch = 0;
        hand.apply(SimKey::PinchNarrower);
        assert_eq!(hand.pinch, 0);
    }

    // ── SimLandmarkSource ────────────────────────────────────────────────

    #[test]
    fn sim_source_follows_input() {
        let (tx, rx) = mpsc::channel();
        let mut src = SimLandmarkSource::new(rx, SimHand::centered(1280, 720, 1.0));

        tx.send(SimInput::PointerMoved { x: 300, y: 600 }).unwrap();
        match src.detect().unwrap() {
            Detection::Hands(h) => {
                assert_eq!(h.len(), 1);
                assert_eq!((h[0].get(0).x, h[0].get(0).y), (300, 600));
            }
            other => panic!("unexpected {:?}", other),
        }

        tx.send(SimInput::Key(SimKey::ToggleHand)).unwrap();
        assert_eq!(src.detect().unwrap(), Detection::Hands(vec![]));

        tx.send(SimInput::Key(SimKey::Quit)).unwrap();
        assert_eq!(src.detect().unwrap(), Detection::Finished);
    }

    #[test]
    fn sim_source_finishes_when_window_gone() {
        let (tx, rx) = mpsc::channel::<SimInput>();
        let mut src = SimLandmarkSource::new(rx, SimHand::centered(640, 480, 1.0));
        drop(tx);
        assert_eq!(src.detect().unwrap(), Detection::Finished);
    }

    // ── JsonLinesSource ──────────────────────────────────────────────────

    fn hand_json(score: f32, points: usize) -> String {
        let pts: Vec<String> = (0..points)
            .map(|i| format!("[{:.3},{:.3},0.0]", 0.4 + i as f32 * 0.01, 0.5))
            .collect();
        format!(r#"{{"score":{},"landmarks":[{}]}}"#, score, pts.join(","))
    }

    fn source(text: String) -> JsonLinesSource<Cursor<Vec<u8>>> {
        JsonLinesSource::new(Cursor::new(text.into_bytes()), (1000, 500), 2, 0.8)
    }

    #[test]
    fn json_converts_normalized_coordinates() {
        let mut src = source(format!("{{\"hands\":[{}]}}\n", hand_json(0.95, 21)));
        match src.detect().unwrap() {
            Detection::Hands(h) => {
                assert_eq!(h.len(), 1);
                assert_eq!((h[0].get(0).x, h[0].get(0).y), (400, 250));
                assert_eq!(h[0].get(20).x, 600);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(src.detect().unwrap(), Detection::Finished);
    }

    #[test]
    fn json_filters_low_confidence_and_partial_hands() {
        let line = format!(
            "{{\"hands\":[{},{},{}]}}\n",
            hand_json(0.5, 21), hand_json(0.9, 20), hand_json(0.9, 21)
        );
        match source(line).detect().unwrap() {
            Detection::Hands(h) => assert_eq!(h.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn json_caps_hand_count() {
        let line = format!(
            "{{\"hands\":[{},{},{}]}}\n",
            hand_json(0.9, 21), hand_json(0.9, 21), hand_json(0.9, 21)
        );
        match source(line).detect().unwrap() {
            Detection::Hands(h) => assert_eq!(h.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn json_blank_lines_and_empty_frames() {
        let mut src = source("\n\n{}\n{\"hands\":[]}\n".to_string());
        assert_eq!(src.detect().unwrap(), Detection::Hands(vec![]));
        assert_eq!(src.detect().unwrap(), Detection::Hands(vec![]));
        assert_eq!(src.detect().unwrap(), Detection::Finished);
    }

    #[test]
    fn json_parse_error_reports_line() {
        let mut src = source("{}\nnot json\n".to_string());
        src.detect().unwrap();
        match src.detect() {
            Err(SourceError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn json_missing_score_counts_as_confident() {
        let pts: Vec<String> = (0..21).map(|_| "[0.5,0.5]".to_string()).collect();
        let line = format!("{{\"hands\":[{{\"landmarks\":[{}]}}]}}\n", pts.join(","));
        match source(line).detect().unwrap() {
            Detection::Hands(h) => assert_eq!(h.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }
}
