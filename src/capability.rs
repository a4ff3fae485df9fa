//! External capability contracts.
//!
//! The core consumes face detection, pixel redaction and output publishing
//! through these narrow traits; concrete detector models, blur/pixelate
//! filters and storage conventions live with the caller. Detection is
//! probabilistic and may miss regions; the run outcome reports how many
//! frames were actually redacted so callers cannot assume full coverage.

use crate::error::CoreResult;
use crate::media::RgbFrame;
use std::path::Path;

/// A candidate bounding region with detection confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Keeps only regions at or above the confidence threshold.
#[must_use]
pub fn filter_by_confidence(
    regions: Vec<DetectionRegion>,
    threshold: f32,
) -> Vec<DetectionRegion> {
    regions
        .into_iter()
        .filter(|region| region.confidence >= threshold)
        .collect()
}

/// Locates candidate face regions in a pixel buffer.
pub trait FaceLocator {
    /// `orientation_hint` is the clockwise rotation in degrees the detector
    /// should assume; frames handed in by the pipeline are already upright,
    /// so the orchestrator passes 0.
    fn locate(
        &mut self,
        frame: &RgbFrame,
        orientation_hint: i32,
    ) -> CoreResult<Vec<DetectionRegion>>;
}

/// Produces a redacted copy of a frame (blur or pixelation over regions).
pub trait FrameRedactor {
    fn redact(&mut self, frame: &RgbFrame, regions: &[DetectionRegion]) -> CoreResult<RgbFrame>;
}

/// Makes the finished container durable/visible in the caller's storage
/// domain. Never invoked for failed or cancelled runs.
pub trait Publisher {
    fn publish(&mut self, output: &Path) -> CoreResult<()>;
}
