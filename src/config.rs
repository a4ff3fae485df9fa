//! Configuration for a redaction run.
//!
//! Instances of [`RedactionConfig`] are created by consumers of the library
//! and passed to [`process_video`](crate::orchestrator::process_video) to
//! control detection, redaction and audio behavior.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Default blur kernel strength (must be odd for gaussian kernels).
pub const DEFAULT_BLUR_STRENGTH: u32 = 51;

/// Default minimum detection confidence for a region to be redacted.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.15;

/// How detected regions are obscured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionMode {
    /// Gaussian blur over the region.
    Gaussian,
    /// Mosaic pixelation over the region.
    Pixelate,
}

/// Parameters controlling one redaction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Blur kernel strength, 1..=101. Even values are rounded up to the
    /// next odd value by [`effective_blur_strength`](Self::effective_blur_strength).
    pub blur_strength: u32,

    /// Redaction filter applied to detected regions.
    pub redaction_mode: RedactionMode,

    /// Minimum confidence for a detection region to be redacted, 0.1..=1.0.
    pub confidence_threshold: f32,

    /// Whether to run face detection at all. When false, frames pass
    /// through unmodified.
    pub detect_faces: bool,

    /// Audio pitch shift in semitones, -12.0..=12.0. Zero selects the
    /// byte-preserving passthrough path.
    pub pitch_shift_semitones: f32,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            blur_strength: DEFAULT_BLUR_STRENGTH,
            redaction_mode: RedactionMode::Gaussian,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            detect_faces: true,
            pitch_shift_semitones: 0.0,
        }
    }
}

impl RedactionConfig {
    /// Validates all field ranges, returning the first violation found.
    pub fn validate(&self) -> CoreResult<()> {
        if !(1..=101).contains(&self.blur_strength) {
            return Err(CoreError::Initialization(format!(
                "blur_strength {} outside 1..=101",
                self.blur_strength
            )));
        }
        if !(0.1..=1.0).contains(&self.confidence_threshold) {
            return Err(CoreError::Initialization(format!(
                "confidence_threshold {} outside 0.1..=1.0",
                self.confidence_threshold
            )));
        }
        if !(-12.0..=12.0).contains(&self.pitch_shift_semitones)
            || !self.pitch_shift_semitones.is_finite()
        {
            return Err(CoreError::Initialization(format!(
                "pitch_shift_semitones {} outside -12.0..=12.0",
                self.pitch_shift_semitones
            )));
        }
        Ok(())
    }

    /// Blur strength normalized to an odd value. Gaussian kernels require
    /// odd dimensions; even inputs round up.
    #[must_use]
    pub fn effective_blur_strength(&self) -> u32 {
        if self.blur_strength % 2 == 1 {
            self.blur_strength
        } else {
            self.blur_strength + 1
        }
    }
}
