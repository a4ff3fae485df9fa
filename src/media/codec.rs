//! Codec and extraction seams.
//!
//! The transcode pipeline drives stateful codecs through these traits
//! rather than binding a concrete implementation: submission and polling
//! follow the hardware-codec choreography (bounded-timeout dequeue, config
//! buffers, explicit end-of-stream markers), and backends adapt whatever
//! encoder or decoder the platform provides. Tests drive the same traits
//! with scripted fakes.

use crate::error::CoreResult;
use crate::media::{RgbFrame, SampleFlags, TrackFormat};
use std::time::Duration;

/// Encoder input color layouts the pipeline can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    /// Planar luma followed by interleaved chroma, 4:2:0 subsampled.
    Yuv420SemiPlanar,
    /// Implementation-chosen flexible 4:2:0 layout; the fallback when the
    /// semi-planar layout is rejected.
    Yuv420Flexible,
}

/// Parameters for configuring a video encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEncoderConfig {
    /// Post-rotation output width.
    pub width: u32,
    /// Post-rotation output height.
    pub height: u32,
    pub bit_rate: u32,
    pub frame_rate: u32,
    pub key_frame_interval_secs: u32,
    pub color_format: ColorFormat,
}

/// Parameters for configuring an audio encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEncoderConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: u32,
}

/// A drained codec output buffer.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    pub data: Vec<u8>,
    pub pts_us: i64,
    pub flags: SampleFlags,
}

/// Result of one bounded output poll.
#[derive(Debug, Clone)]
pub enum DequeuedOutput {
    /// Nothing available within the timeout.
    TryAgain,
    /// The codec negotiated its output format; for encoders this is the
    /// moment the track can be registered with the muxer.
    FormatChanged(TrackFormat),
    /// A drained buffer, possibly config-flagged or empty.
    Buffer(OutputBuffer),
}

/// A stateful video encoder.
pub trait VideoEncoder {
    /// Applies the configuration. A rejected color format returns an error;
    /// the pipeline retries once with the flexible fallback.
    fn configure(&mut self, config: &VideoEncoderConfig) -> CoreResult<()>;

    /// Attempts to acquire an input slot within `timeout` and submit one
    /// buffer. Returns `Ok(false)` when no slot freed up in time; the
    /// caller retries. An empty buffer with `END_OF_STREAM` terminates the
    /// stream.
    fn queue_input(
        &mut self,
        data: &[u8],
        pts_us: i64,
        flags: SampleFlags,
        timeout: Duration,
    ) -> CoreResult<bool>;

    /// Polls for output with a bounded timeout.
    fn dequeue_output(&mut self, timeout: Duration) -> CoreResult<DequeuedOutput>;

    /// Releases the encoder. Failures are logged by the implementation and
    /// never propagate; teardown must run to completion.
    fn stop(&mut self);
}

/// A stateful audio decoder producing interleaved 16-bit PCM.
pub trait AudioDecoder {
    fn queue_input(
        &mut self,
        data: &[u8],
        pts_us: i64,
        flags: SampleFlags,
        timeout: Duration,
    ) -> CoreResult<bool>;

    /// Drained buffers carry interleaved little-endian `i16` PCM.
    fn dequeue_output(&mut self, timeout: Duration) -> CoreResult<DequeuedOutput>;

    fn stop(&mut self);
}

/// A stateful audio encoder consuming interleaved 16-bit PCM.
pub trait AudioEncoder {
    fn configure(&mut self, config: &AudioEncoderConfig) -> CoreResult<()>;

    fn queue_input(
        &mut self,
        data: &[u8],
        pts_us: i64,
        flags: SampleFlags,
        timeout: Duration,
    ) -> CoreResult<bool>;

    fn dequeue_output(&mut self, timeout: Duration) -> CoreResult<DequeuedOutput>;

    fn stop(&mut self);
}

/// One compressed sample read from a source container.
#[derive(Debug, Clone)]
pub struct SourcePacket {
    pub data: Vec<u8>,
    pub pts_us: i64,
    pub flags: SampleFlags,
}

/// Sequential access to a container's compressed audio samples.
pub trait SampleSource {
    /// Selects the first audio track, returning its format, or `None` when
    /// the source carries no audio.
    fn select_audio_track(&mut self) -> CoreResult<Option<TrackFormat>>;

    /// Reads the next sample of the selected track; `None` once exhausted.
    fn next_packet(&mut self) -> CoreResult<Option<SourcePacket>>;
}

/// Timestamp-addressed access to decoded, upright video frames.
///
/// Implementations return the frame nearest to the requested timestamp with
/// rotation already applied, mirroring seek-based retrieval; `None` means
/// no frame could be decoded for that position.
pub trait FrameSource {
    fn frame_at(&mut self, pts_us: i64) -> CoreResult<Option<RgbFrame>>;
}
