//! # hand_volume
//!
//! Hand-gesture system volume controller.  Each frame the first detected
//! hand is reduced to a pinch distance and a finger state, which select the
//! volume level sent to the mixer.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Fingers | Action |
//! |---|---|---|
//! | Volume pose | Pinky down, three or more fingers up | Pinch distance sets the level (steps of 5 %) |
//! | Fist | None up | Level forced to `mute_level` (20 %) |
//! | Anything else | — | Volume left alone |
//! | No hand | — | Level forced to `no_hand_level` (20 %, or off) |
//!
//! The mixer is only called when the requested level differs from what it
//! already reports.
//!
//! ## Sources
//!
//! * `sim` (default) — **Simulation mode**: a synthetic right hand driven by
//!   the keyboard and mouse in the visualizer window.
//! * `jsonl` — detections streamed as JSON lines from an external landmark
//!   detector, from a file or stdin; works with `--headless`.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Effect |
//! |---|---|
//! | Mouse | Move the hand |
//! | `Up` / `Down` (hold) | Widen / narrow the pinch |
//! | `1`–`5` | Toggle thumb … pinky |
//! | `V` | Volume pose (pinky down) |
//! | `F` | Fist |
//! | `O` | Open hand |
//! | `H` | Hand enters / leaves the frame |
//! | `Q` / `Escape` | Quit |

pub mod gesture;
pub mod config;
pub mod visualizer;
pub mod app;
