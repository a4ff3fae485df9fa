//! Metadata probing and fallback resolution.
//!
//! A [`MetadataProbe`] implementation reads whatever container-level facts
//! the source exposes; [`resolve_metadata`] turns those best-effort facts
//! into a complete [`VideoMetadata`] using documented fallback defaults.
//! Resolution never fails; downstream stages tolerate degraded accuracy.

use crate::error::CoreResult;
use crate::media::{Rotation, VideoMetadata};

/// Default dimensions when the container reports none.
pub const FALLBACK_WIDTH: u32 = 1920;
pub const FALLBACK_HEIGHT: u32 = 1080;

/// Default frame rate when neither a capture rate nor a frame count is
/// available.
pub const FALLBACK_FRAME_RATE: f32 = 30.0;

/// Raw container-level facts as probed, every field optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbedFacts {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_us: Option<i64>,
    /// Explicit capture frame rate, the highest-priority rate source.
    pub capture_frame_rate: Option<f32>,
    /// Total frame count, used to derive a rate from the duration.
    pub frame_count: Option<u64>,
    pub rotation_degrees: Option<i32>,
}

/// Reads container-level facts from a source. Unreadable sources fail with
/// [`CoreError::Initialization`](crate::error::CoreError::Initialization);
/// a readable source always yields facts, however sparse.
pub trait MetadataProbe {
    fn probe(&mut self) -> CoreResult<ProbedFacts>;
}

/// Resolves probed facts into complete metadata.
///
/// Frame rate fallback chain, in priority order: explicit capture rate,
/// then frame count divided by duration, then a constant 30. Downstream
/// timestamp math depends on this exact order.
#[must_use]
pub fn resolve_metadata(facts: &ProbedFacts) -> VideoMetadata {
    let width = facts.width.filter(|w| *w > 0).unwrap_or(FALLBACK_WIDTH);
    let height = facts.height.filter(|h| *h > 0).unwrap_or(FALLBACK_HEIGHT);
    let duration_us = facts.duration_us.unwrap_or(0).max(0);

    let frame_rate = facts
        .capture_frame_rate
        .filter(|rate| rate.is_finite() && *rate > 0.0)
        .or_else(|| derived_rate(facts.frame_count, duration_us))
        .unwrap_or(FALLBACK_FRAME_RATE);

    let rotation = facts
        .rotation_degrees
        .map(Rotation::from_degrees)
        .unwrap_or_default();

    VideoMetadata {
        width,
        height,
        duration_us,
        frame_rate,
        rotation,
    }
}

fn derived_rate(frame_count: Option<u64>, duration_us: i64) -> Option<f32> {
    let frames = frame_count?;
    if duration_us <= 0 || frames == 0 {
        return None;
    }
    Some((frames as f64 / (duration_us as f64 / 1_000_000.0)) as f32)
}
