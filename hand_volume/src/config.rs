//! Application configuration.
//!
//! Loaded from an optional JSON file (`--config`); every field has a
//! default, so a file only needs the fields it changes:
//!
//! ```json
//! { "scale": 1.5, "no_hand_level": null }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use hand_pose::ThumbSide;
use pinch_volume::{DistanceRange, VolumeLevel, quantize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// ConfigError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ════════════════════════════════════════════════════════════════════════════
// HandSide
// ════════════════════════════════════════════════════════════════════════════

/// Which hand (as seen by a mirrored front camera) the thumb test assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSide {
    #[default]
    Right,
    Left,
}

impl From<HandSide> for ThumbSide {
    fn from(side: HandSide) -> Self {
        match side {
            HandSide::Right => ThumbSide::Right,
            HandSide::Left  => ThumbSide::Left,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display scale factor; multiplies the frame size, the pinch distance
    /// and the distance range.
    pub scale:                    f64,
    pub frame_width:              u32,
    pub frame_height:             u32,
    /// Usable pinch range at scale 1, `[low, high]`.
    pub distance_range:           [u32; 2],
    /// Level applied by the fist gesture.
    pub mute_level:               u8,
    /// Level applied when no hand is visible; `null` leaves the volume alone.
    pub no_hand_level:            Option<u8>,
    pub thumb_side:               HandSide,
    /// At most this many hands are taken from each detection.
    pub max_hands:                usize,
    /// Hands scored below this are ignored by the landmark stream reader.
    pub min_detection_confidence: f32,
    /// Start level of the simulated mixer, in native units.
    pub initial_native_level:     f32,
    /// Minimum spacing of repeated mixer-failure warnings.
    pub mixer_warn_interval_ms:   u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            scale:                    1.0,
            frame_width:              1280,
            frame_height:             720,
            distance_range:           [DistanceRange::DEFAULT_LOW, DistanceRange::DEFAULT_HIGH],
            mute_level:               20,
            no_hand_level:            Some(20),
            thumb_side:               HandSide::Right,
            max_hands:                2,
            min_detection_confidence: 0.8,
            initial_native_level:     -20.0,
            mixer_warn_interval_ms:   5_000,
        }
    }
}

impl AppConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: AppConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ConfigError::Invalid(format!("scale must be > 0, got {}", self.scale)));
        }
        let [low, high] = self.distance_range;
        if low >= high {
            return Err(ConfigError::Invalid(format!(
                "distance_range low ({}) must be below high ({})", low, high
            )));
        }
        if self.mute_level > 100 {
            return Err(ConfigError::Invalid(format!("mute_level {} exceeds 100", self.mute_level)));
        }
        if let Some(l) = self.no_hand_level {
            if l > 100 {
                return Err(ConfigError::Invalid(format!("no_hand_level {} exceeds 100", l)));
            }
        }
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(ConfigError::Invalid(format!(
                "min_detection_confidence must be within 0–1, got {}",
                self.min_detection_confidence
            )));
        }
        if self.max_hands == 0 {
            return Err(ConfigError::Invalid("max_hands must be at least 1".into()));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ConfigError::Invalid("frame size must be non-zero".into()));
        }
        Ok(())
    }

    /// Pinch range after display scaling.
    pub fn distance_range(&self) -> DistanceRange {
        DistanceRange::new(self.distance_range[0], self.distance_range[1]).scale(self.scale)
    }

    /// Frame (and window) size after display scaling.
    pub fn frame_size(&self) -> (u32, u32) {
        (
            (self.frame_width  as f64 * self.scale) as u32,
            (self.frame_height as f64 * self.scale) as u32,
        )
    }

    pub fn mute_level(&self) -> VolumeLevel {
        quantize(self.mute_level as i64)
    }

    pub fn no_hand_level(&self) -> Option<VolumeLevel> {
        self.no_hand_level.map(|l| quantize(l as i64))
    }

    pub fn thumb_side(&self) -> ThumbSide {
        self.thumb_side.into()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
