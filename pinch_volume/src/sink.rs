//! Debounced application of volume levels to an audio mixer.
//!
//! The sink never sends a level the mixer already has: it reads the mixer's
//! current native level and compares it, to two decimals, with the native
//! level the target would produce.  The mixer itself is the debounce state,
//! so a volume changed by someone else is corrected on the next apply.

use thiserror::Error;
use tracing::{debug, info};

use crate::curve::{native_for_level, native_for_scalar, same_hundredths};
use crate::level::VolumeLevel;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

/// A failure reported by a mixer backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixerError {
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("mixer backend error: {0}")]
    Backend(String),
}

/// A failed [`VolumeSink::apply`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("could not read the current mixer level: {0}")]
    Query(#[source] MixerError),

    #[error("could not set the mixer to {level}: {source}")]
    Set {
        level:  VolumeLevel,
        #[source]
        source: MixerError,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// Mixer — abstraction over the OS endpoint / simulation
// ════════════════════════════════════════════════════════════════════════════

/// An audio output mixer.
pub trait Mixer {
    /// Current level in the mixer's native (non-linear) units.
    fn current_level(&mut self) -> Result<f32, MixerError>;

    /// Set the level on a linear `[0, 1]` scale.
    fn set_level_scalar(&mut self, scalar: f32) -> Result<(), MixerError>;
}

impl<M: Mixer + ?Sized> Mixer for Box<M> {
    fn current_level(&mut self) -> Result<f32, MixerError> {
        (**self).current_level()
    }
    fn set_level_scalar(&mut self, scalar: f32) -> Result<(), MixerError> {
        (**self).set_level_scalar(scalar)
    }
}

// ── in-memory backend ─────────────────────────────────────────────────────

/// A mixer that lives in memory and follows the sampled native curve.
///
/// Used when no OS mixer binding is wired in, and as the test double.
#[derive(Clone, Debug)]
pub struct SimulatedMixer {
    native:    f32,
    set_calls: usize,
}

impl SimulatedMixer {
    /// Start at `native` (native units, e.g. `-20.0`).
    pub fn new(native: f32) -> Self {
        SimulatedMixer { native, set_calls: 0 }
    }

    /// Start exactly at `level`.
    pub fn at_level(level: VolumeLevel) -> Self {
        SimulatedMixer::new(native_for_level(level))
    }

    pub fn native_level(&self) -> f32 { self.native }

    /// How many times [`Mixer::set_level_scalar`] has been called.
    pub fn set_calls(&self) -> usize { self.set_calls }
}

impl Default for SimulatedMixer {
    fn default() -> Self {
        SimulatedMixer::at_level(VolumeLevel::MAX)
    }
}

impl Mixer for SimulatedMixer {
    fn current_level(&mut self) -> Result<f32, MixerError> {
        Ok(self.native)
    }

    fn set_level_scalar(&mut self, scalar: f32) -> Result<(), MixerError> {
        self.set_calls += 1;
        self.native = native_for_scalar(scalar);
        debug!(scalar, native = self.native, "simulated mixer level set");
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// VolumeSink
// ════════════════════════════════════════════════════════════════════════════

/// Result of a successful [`VolumeSink::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkOutcome {
    /// The mixer was told to change to this level.
    Applied(VolumeLevel),
    /// The mixer was already there; nothing was sent.
    Unchanged(VolumeLevel),
}

impl SinkOutcome {
    pub fn level(self) -> VolumeLevel {
        match self {
            SinkOutcome::Applied(l) | SinkOutcome::Unchanged(l) => l,
        }
    }

    pub fn is_applied(self) -> bool {
        matches!(self, SinkOutcome::Applied(_))
    }
}

/// Applies [`VolumeLevel`]s to a [`Mixer`], skipping redundant sets.
pub struct VolumeSink<M: Mixer> {
    mixer:        M,
    last_applied: Option<VolumeLevel>,
}

impl<M: Mixer> VolumeSink<M> {
    pub fn new(mixer: M) -> Self {
        VolumeSink { mixer, last_applied: None }
    }

    /// Send `level` to the mixer unless it is already there.
    ///
    /// Errors are returned, not swallowed; callers in a frame loop are
    /// expected to log and carry on.
    pub fn apply(&mut self, level: VolumeLevel) -> Result<SinkOutcome, SinkError> {
        let target  = native_for_level(level);
        let current = self.mixer.current_level().map_err(SinkError::Query)?;

        if same_hundredths(current, target) {
            return Ok(SinkOutcome::Unchanged(level));
        }

        self.mixer
            .set_level_scalar(level.scalar())
            .map_err(|source| SinkError::Set { level, source })?;
        self.last_applied = Some(level);
        info!(level = level.percent(), "Volume set to: {}", level);
        Ok(SinkOutcome::Applied(level))
    }

    /// The last level this sink sent to the mixer, if any.
    pub fn last_applied(&self) -> Option<VolumeLevel> { self.last_applied }

    pub fn mixer(&self) -> &M { &self.mixer }

    pub fn mixer_mut(&mut self) -> &mut M { &mut self.mixer }

    pub fn into_inner(self) -> M { self.mixer }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
