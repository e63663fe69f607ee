//! # pinch_volume
//!
//! Turns a normalized pinch distance into a system volume change.
//!
//! ```text
//!  pinch distance ──► map_distance_to_level ──► VolumeLevel (0..=100, step 5)
//!                                                   │
//!                                                   ▼
//!                          VolumeSink::apply ──► Mixer (native dB-like curve)
//! ```
//!
//! * [`level`] — clamped linear interpolation and step-5 quantization.
//! * [`curve`] — the sampled native loudness curve of the mixer.
//! * [`sink`]  — the [`Mixer`] trait, the debouncing [`VolumeSink`], and an
//!   in-memory [`SimulatedMixer`].
//!
//! ## Quick start
//!
//! ```rust
//! use pinch_volume::{DistanceRange, SimulatedMixer, VolumeSink, map_distance_to_level};
//!
//! let mut sink = VolumeSink::new(SimulatedMixer::new(-20.0));
//! let level = map_distance_to_level(125, DistanceRange::default());
//! assert_eq!(level.percent(), 50);
//! assert!(sink.apply(level).unwrap().is_applied());
//! assert!(!sink.apply(level).unwrap().is_applied());
//! ```

pub mod curve;
pub mod level;
pub mod sink;

pub use curve::{NATIVE_LEVELS, native_for_level, native_for_scalar};
pub use level::{
    DistanceRange, VolumeLevel, interpolate, map_distance_to_bar, map_distance_to_level,
    quantize,
};
pub use sink::{Mixer, MixerError, SimulatedMixer, SinkError, SinkOutcome, VolumeSink};
