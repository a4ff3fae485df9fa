//! Core library for privacy-preserving video redaction transcodes.
//!
//! This crate probes a source video, re-encodes it frame by frame with
//! detected face regions redacted, carries the audio track through either
//! verbatim or pitch-shifted, and muxes both into a synchronized MP4. The
//! platform codec, container, and detection integrations sit behind traits
//! so the pipeline logic stays testable without real media hardware.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shroud::{process_video, progress_channel, CancellationToken, RedactionConfig};
//! use std::path::Path;
//!
//! let config = RedactionConfig::default();
//! let (mut progress, updates) = progress_channel(64);
//! let cancel = CancellationToken::new();
//!
//! let outcome = process_video(
//!     &backend,
//!     &mut locator,
//!     &mut redactor,
//!     &mut publisher,
//!     &config,
//!     Path::new("/path/to/input.mp4"),
//!     Path::new("/path/to/output.mp4"),
//!     &mut progress,
//!     &cancel,
//! )?;
//! println!("redacted {} of {} frames", outcome.frames_redacted, outcome.frames_processed);
//! ```

pub mod cancel;
pub mod capability;
pub mod config;
pub mod error;
pub mod media;
pub mod orchestrator;
pub mod pipeline;
pub mod pitch;
pub mod pixel;
pub mod progress;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use cancel::CancellationToken;
pub use capability::{DetectionRegion, FaceLocator, FrameRedactor, Publisher};
pub use config::{RedactionConfig, RedactionMode};
pub use error::{CoreError, CoreResult};
pub use media::probe::{resolve_metadata, MetadataProbe, ProbedFacts};
pub use media::{MediaBackend, RgbFrame, Rotation, TrackFormat, VideoMetadata};
pub use orchestrator::{process_video, AudioStatus, TranscodeOutcome};
pub use pipeline::{AudioPlan, VideoEncodePipeline};
pub use progress::{progress_channel, ProgressSender, ProgressUpdate};
pub use utils::{format_bytes, format_duration};
