//! Video encode pipeline.
//!
//! Drives a stateful video encoder through configuration, format
//! negotiation, per-frame submission, draining and end-of-stream, writing
//! encoded samples through a [`MuxSession`]. The state machine is
//! `Unconfigured -> Configuring -> AwaitingFormat -> Streaming -> Draining
//! -> Finished | Failed`.

use crate::cancel::CancellationToken;
use crate::error::{CoreError, CoreResult};
use crate::media::codec::{
    ColorFormat, DequeuedOutput, OutputBuffer, VideoEncoder, VideoEncoderConfig,
};
use crate::media::mux::{ContainerSink, MuxSession};
use crate::media::{EncodedSample, SampleFlags, TrackKind, VideoMetadata};
use std::time::Duration;

/// Bounded timeout for every encoder dequeue call.
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(10);

/// Polls allowed while waiting for the output format before giving up.
const FORMAT_POLL_LIMIT: u32 = 500;

/// Polls allowed while waiting for an input slot.
const INPUT_POLL_LIMIT: u32 = 500;

/// Polls allowed while draining after end-of-stream submission.
const DRAIN_POLL_LIMIT: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Unconfigured,
    Configuring,
    AwaitingFormat,
    Streaming,
    Draining,
    Finished,
    Failed,
}

pub struct VideoEncodePipeline<E: VideoEncoder> {
    encoder: E,
    state: PipelineState,
    frame_time_us: i64,
    frame_index: u64,
    /// Running presentation clock, `frame_index * frame_time`.
    clock_us: i64,
    wrote_first_sample: bool,
}

impl<E: VideoEncoder> VideoEncodePipeline<E> {
    /// Configures `encoder` for the post-rotation output geometry.
    ///
    /// Bit rate heuristic is `width * height * 3`; key-frame interval one
    /// second. If the semi-planar color format is rejected the flexible
    /// fallback is tried once before failing with `CodecConfiguration`.
    pub fn configure(mut encoder: E, metadata: &VideoMetadata) -> CoreResult<Self> {
        let (width, height) = metadata.normalized_dimensions();
        let mut config = VideoEncoderConfig {
            width,
            height,
            bit_rate: width * height * 3,
            frame_rate: metadata.frame_rate.max(1.0) as u32,
            key_frame_interval_secs: 1,
            color_format: ColorFormat::Yuv420SemiPlanar,
        };

        if let Err(primary) = encoder.configure(&config) {
            log::warn!(
                "semi-planar color format rejected ({primary}), retrying with flexible"
            );
            config.color_format = ColorFormat::Yuv420Flexible;
            encoder.configure(&config).map_err(|fallback| {
                CoreError::CodecConfiguration(format!(
                    "both color formats rejected: {primary}; {fallback}"
                ))
            })?;
        }
        log::debug!(
            "video encoder configured: {}x{} @ {} fps, {} bps",
            width,
            height,
            config.frame_rate,
            config.bit_rate
        );

        Ok(Self {
            encoder,
            state: PipelineState::AwaitingFormat,
            frame_time_us: metadata.frame_time_us(),
            frame_index: 0,
            clock_us: 0,
            wrote_first_sample: false,
        })
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[must_use]
    pub fn frames_submitted(&self) -> u64 {
        self.frame_index
    }

    /// Polls output until the encoder reports its format, then registers
    /// the video track with `session`. Codec-config buffers seen before
    /// the format event are acknowledged, never written as samples.
    pub fn await_format<S: ContainerSink>(
        &mut self,
        session: &mut MuxSession<S>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        if self.state != PipelineState::AwaitingFormat {
            return Err(CoreError::Encoding(format!(
                "await_format in state {:?}",
                self.state
            )));
        }
        for _ in 0..FORMAT_POLL_LIMIT {
            cancel.check()?;
            match self.encoder.dequeue_output(DEQUEUE_TIMEOUT)? {
                DequeuedOutput::FormatChanged(format) => {
                    session.register_video(&format)?;
                    self.state = PipelineState::Streaming;
                    log::debug!("video output format received, track registered");
                    return Ok(());
                }
                DequeuedOutput::Buffer(buffer) => {
                    if buffer.flags.contains(SampleFlags::CODEC_CONFIG) {
                        log::debug!(
                            "codec config buffer received before format ({} bytes)",
                            buffer.data.len()
                        );
                    }
                }
                DequeuedOutput::TryAgain => {}
            }
        }
        self.state = PipelineState::Failed;
        Err(CoreError::FormatNegotiationTimeout)
    }

    /// Submits one packed YUV frame and drains any immediately available
    /// output into the session.
    ///
    /// The very first frame is forced to timestamp 0 and tagged key-frame
    /// regardless of computed timing; later frames ride the running clock.
    pub fn submit_frame<S: ContainerSink>(
        &mut self,
        yuv: &[u8],
        session: &mut MuxSession<S>,
    ) -> CoreResult<()> {
        if self.state != PipelineState::Streaming {
            return Err(CoreError::Encoding(format!(
                "frame submitted in state {:?}",
                self.state
            )));
        }
        let (pts_us, flags) = if self.frame_index == 0 {
            (0, SampleFlags::KEY_FRAME)
        } else {
            (self.clock_us, SampleFlags::empty())
        };

        let mut queued = false;
        for _ in 0..INPUT_POLL_LIMIT {
            if self.encoder.queue_input(yuv, pts_us, flags, DEQUEUE_TIMEOUT)? {
                queued = true;
                break;
            }
        }
        if !queued {
            self.state = PipelineState::Failed;
            return Err(CoreError::Encoding(
                "no encoder input slot became available".to_string(),
            ));
        }

        self.frame_index += 1;
        self.clock_us += self.frame_time_us;
        self.drain_available(session)
    }

    /// Drains all immediately available output buffers (retry-until-empty,
    /// non-blocking beyond the bounded per-call timeout).
    fn drain_available<S: ContainerSink>(
        &mut self,
        session: &mut MuxSession<S>,
    ) -> CoreResult<()> {
        loop {
            match self.encoder.dequeue_output(DEQUEUE_TIMEOUT)? {
                DequeuedOutput::TryAgain => return Ok(()),
                DequeuedOutput::FormatChanged(_) => {
                    log::warn!("encoder format changed mid-stream, ignoring");
                }
                DequeuedOutput::Buffer(buffer) => self.write_output(session, buffer)?,
            }
        }
    }

    /// Writes one drained buffer, applying the container entry-point
    /// fixups: the first written sample must carry the key-frame flag and
    /// timestamp 0, and negative timestamps take the running clock.
    fn write_output<S: ContainerSink>(
        &mut self,
        session: &mut MuxSession<S>,
        mut buffer: OutputBuffer,
    ) -> CoreResult<()> {
        if buffer.flags.contains(SampleFlags::CODEC_CONFIG) || buffer.data.is_empty() {
            return Ok(());
        }
        if buffer.pts_us < 0 {
            buffer.pts_us = if self.wrote_first_sample {
                self.clock_us
            } else {
                0
            };
            log::debug!("negative output timestamp replaced with {}", buffer.pts_us);
        }
        if !self.wrote_first_sample {
            if buffer.pts_us != 0 {
                log::debug!("forcing first sample timestamp {} -> 0", buffer.pts_us);
                buffer.pts_us = 0;
            }
            if !buffer.flags.contains(SampleFlags::KEY_FRAME) {
                log::warn!("first encoded sample missing key-frame flag, forcing it");
                buffer.flags |= SampleFlags::KEY_FRAME;
            }
            self.wrote_first_sample = true;
        }
        session.write(&EncodedSample {
            data: buffer.data,
            pts_us: buffer.pts_us,
            flags: buffer.flags,
            track: TrackKind::Video,
        })
    }

    /// Submits the end-of-stream marker and drains until the encoder
    /// acknowledges it, writing any trailing payload.
    pub fn finish<S: ContainerSink>(
        &mut self,
        session: &mut MuxSession<S>,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        if self.state != PipelineState::Streaming {
            return Err(CoreError::Encoding(format!(
                "finish in state {:?}",
                self.state
            )));
        }
        self.state = PipelineState::Draining;

        let mut queued = false;
        for _ in 0..INPUT_POLL_LIMIT {
            cancel.check()?;
            if self.encoder.queue_input(
                &[],
                self.clock_us,
                SampleFlags::END_OF_STREAM,
                DEQUEUE_TIMEOUT,
            )? {
                queued = true;
                break;
            }
        }
        if !queued {
            self.state = PipelineState::Failed;
            return Err(CoreError::Encoding(
                "could not submit end-of-stream marker".to_string(),
            ));
        }

        for _ in 0..DRAIN_POLL_LIMIT {
            cancel.check()?;
            match self.encoder.dequeue_output(DEQUEUE_TIMEOUT)? {
                DequeuedOutput::TryAgain | DequeuedOutput::FormatChanged(_) => {}
                DequeuedOutput::Buffer(buffer) => {
                    let end_of_stream = buffer.flags.contains(SampleFlags::END_OF_STREAM);
                    self.write_output(session, buffer)?;
                    if end_of_stream {
                        self.state = PipelineState::Finished;
                        self.encoder.stop();
                        return Ok(());
                    }
                }
            }
        }
        self.state = PipelineState::Failed;
        Err(CoreError::Encoding(
            "encoder never signalled end of stream".to_string(),
        ))
    }
}

impl<E: VideoEncoder> Drop for VideoEncodePipeline<E> {
    fn drop(&mut self) {
        // Release the encoder on abnormal exits too; stop() logs its own
        // failures and never masks the primary outcome.
        if !matches!(self.state, PipelineState::Finished) {
            self.encoder.stop();
        }
    }
}
