//! Encode pipelines for the two tracks.

pub mod audio;
pub mod video;

pub use audio::{prepare_audio_track, AudioPlan};
pub use video::{PipelineState, VideoEncodePipeline};
