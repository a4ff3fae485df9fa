//! Backend factory seam.
//!
//! A [`MediaBackend`] bundles the platform-specific pieces the orchestrator
//! needs: metadata probing, frame decoding, codecs, sample extraction and
//! container writing. The orchestrator is generic over this trait so
//! platforms inject real codecs and tests inject scripted fakes.

use crate::error::CoreResult;
use crate::media::codec::{
    AudioDecoder, AudioEncoder, FrameSource, SampleSource, VideoEncoder,
};
use crate::media::mux::ContainerSink;
use crate::media::probe::MetadataProbe;
use crate::media::{TrackFormat, VideoMetadata};
use std::path::Path;

pub trait MediaBackend {
    type Probe: MetadataProbe;
    type Frames: FrameSource;
    type VideoEnc: VideoEncoder;
    type AudioDec: AudioDecoder;
    type AudioEnc: AudioEncoder;
    type Source: SampleSource;
    type Sink: ContainerSink;

    /// Opens a metadata probe over the input.
    fn open_probe(&self, input: &Path) -> CoreResult<Self::Probe>;

    /// Opens a decoded-frame source over the input. `metadata` carries the
    /// resolved probe results so the source can normalize rotation.
    fn open_frame_source(
        &self,
        input: &Path,
        metadata: &VideoMetadata,
    ) -> CoreResult<Self::Frames>;

    /// Creates an unconfigured video encoder.
    fn create_video_encoder(&self) -> CoreResult<Self::VideoEnc>;

    /// Creates an audio decoder for the given source track format.
    fn create_audio_decoder(&self, format: &TrackFormat) -> CoreResult<Self::AudioDec>;

    /// Creates an unconfigured audio encoder.
    fn create_audio_encoder(&self) -> CoreResult<Self::AudioEnc>;

    /// Opens a compressed-sample extractor over a container file.
    fn open_sample_source(&self, input: &Path) -> CoreResult<Self::Source>;

    /// Creates a container writer at the given path.
    fn create_container(&self, output: &Path) -> CoreResult<Self::Sink>;
}
