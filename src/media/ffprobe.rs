//! FFprobe-backed metadata probe.
//!
//! Implements [`MetadataProbe`] over the `ffprobe` crate (which shells out
//! to the ffprobe binary). Only facts the tool reliably exposes are
//! populated; everything else is left to the fallback resolution in
//! [`probe`](crate::media::probe).

use crate::error::{CoreError, CoreResult};
use crate::media::probe::{MetadataProbe, ProbedFacts};
use ffprobe::ffprobe;
use std::path::PathBuf;

/// Probes a local file with the ffprobe binary.
pub struct FfprobeProbe {
    path: PathBuf,
}

impl FfprobeProbe {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetadataProbe for FfprobeProbe {
    fn probe(&mut self) -> CoreResult<ProbedFacts> {
        log::debug!("running ffprobe on: {}", self.path.display());
        let metadata = ffprobe(&self.path).map_err(|err| {
            CoreError::Initialization(format!(
                "ffprobe failed for {}: {err:?}",
                self.path.display()
            ))
        })?;

        let duration_us = metadata
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .map(|secs| (secs * 1_000_000.0) as i64);

        let mut facts = ProbedFacts {
            duration_us,
            ..Default::default()
        };

        if let Some(stream) = metadata
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
        {
            facts.width = stream.width.and_then(|w| u32::try_from(w).ok());
            facts.height = stream.height.and_then(|h| u32::try_from(h).ok());
            facts.capture_frame_rate = parse_rational_rate(&stream.avg_frame_rate);
            facts.frame_count = stream.nb_frames.as_deref().and_then(|n| n.parse().ok());
            // Rotation lives in a display-matrix side data entry the
            // ffprobe crate does not surface; left unset (defaults to 0).
        } else {
            log::warn!("no video stream found in {}", self.path.display());
        }

        Ok(facts)
    }
}

/// Parses an ffprobe rational rate string such as `"30000/1001"`.
/// Degenerate rates (`"0/0"`, zero denominators) yield `None`.
fn parse_rational_rate(rate: &str) -> Option<f32> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some((num / den) as f32)
}
