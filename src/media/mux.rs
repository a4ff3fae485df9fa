//! Container muxing.
//!
//! [`ContainerSink`] is the backend seam for a concrete container writer;
//! [`MuxSession`] wraps one and enforces the ordering invariants the
//! container format requires: every track registered before start, start
//! exactly once, no sample written before start, config and zero-length
//! buffers stripped rather than written.

use crate::error::{CoreError, CoreResult};
use crate::media::{EncodedSample, SampleFlags, TrackFormat, TrackKind};

/// Identifier for a registered track within a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackId(pub usize);

/// A concrete container writer (e.g. an MP4 muxer).
pub trait ContainerSink {
    fn add_track(&mut self, format: &TrackFormat) -> CoreResult<TrackId>;
    fn start(&mut self) -> CoreResult<()>;
    fn write_sample(&mut self, track: TrackId, sample: &EncodedSample) -> CoreResult<()>;
    /// Finalizes the container index. Must only be called after `start`.
    fn finish(&mut self) -> CoreResult<()>;
}

/// Stateful wrapper synchronizing one or two encoded streams into a sink.
pub struct MuxSession<S: ContainerSink> {
    sink: S,
    video_track: Option<TrackId>,
    audio_track: Option<TrackId>,
    started: bool,
}

impl<S: ContainerSink> MuxSession<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            video_track: None,
            audio_track: None,
            started: false,
        }
    }

    /// Registers the video track. Tracks are registered lazily as their
    /// owning pipeline's output format becomes known, but always before
    /// `start`.
    pub fn register_video(&mut self, format: &TrackFormat) -> CoreResult<()> {
        self.register(format, TrackKind::Video)
    }

    /// Registers the (optional) audio track.
    pub fn register_audio(&mut self, format: &TrackFormat) -> CoreResult<()> {
        self.register(format, TrackKind::Audio)
    }

    fn register(&mut self, format: &TrackFormat, kind: TrackKind) -> CoreResult<()> {
        if self.started {
            return Err(CoreError::Muxing(format!(
                "{kind:?} track registered after session start"
            )));
        }
        if format.kind() != kind {
            return Err(CoreError::Muxing(format!(
                "format kind {:?} does not match track kind {kind:?}",
                format.kind()
            )));
        }
        let slot = match kind {
            TrackKind::Video => &mut self.video_track,
            TrackKind::Audio => &mut self.audio_track,
        };
        if slot.is_some() {
            return Err(CoreError::Muxing(format!(
                "{kind:?} track registered twice"
            )));
        }
        *slot = Some(self.sink.add_track(format)?);
        Ok(())
    }

    /// Starts the session. Only legal once at least one track has been
    /// registered, and only once.
    pub fn start(&mut self) -> CoreResult<()> {
        if self.started {
            return Err(CoreError::Muxing("session started twice".to_string()));
        }
        if self.video_track.is_none() && self.audio_track.is_none() {
            return Err(CoreError::Muxing(
                "session started with no registered tracks".to_string(),
            ));
        }
        self.sink.start()?;
        self.started = true;
        Ok(())
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn has_audio_track(&self) -> bool {
        self.audio_track.is_some()
    }

    /// Writes one sample to its track.
    ///
    /// Codec-config and zero-length buffers are stripped silently: they
    /// carry no playable payload and their configuration was captured at
    /// registration. Real samples before `start` are rejected.
    pub fn write(&mut self, sample: &EncodedSample) -> CoreResult<()> {
        if sample.flags.contains(SampleFlags::CODEC_CONFIG) || sample.data.is_empty() {
            log::debug!(
                "stripping {} byte {:?} buffer (flags {:?})",
                sample.data.len(),
                sample.track,
                sample.flags
            );
            return Ok(());
        }
        if !self.started {
            return Err(CoreError::Muxing(
                "sample written before session start".to_string(),
            ));
        }
        let track = match sample.track {
            TrackKind::Video => self.video_track,
            TrackKind::Audio => self.audio_track,
        }
        .ok_or_else(|| {
            CoreError::Muxing(format!("no {:?} track registered", sample.track))
        })?;
        self.sink.write_sample(track, sample)
    }

    /// Finalizes the container. A session that never started has nothing
    /// to finalize; that is logged, not an error, so teardown paths can
    /// call this unconditionally.
    pub fn finish(mut self) -> CoreResult<()> {
        if self.started {
            self.sink.finish()
        } else {
            log::warn!("mux session finished without ever starting");
            Ok(())
        }
    }
}
