//! Core media data types shared across the pipeline.
//!
//! Everything here is created and destroyed within a single orchestration
//! run; nothing persists across runs.

use bitflags::bitflags;

pub mod codec;
pub mod ffprobe;
pub mod mux;
pub mod probe;

mod backend;
pub use backend::MediaBackend;

bitflags! {
    /// Flags attached to codec input and output buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SampleFlags: u32 {
        /// Self-contained sample requiring no prior sample to decode.
        const KEY_FRAME = 0x0001;
        /// Out-of-band codec configuration (e.g. parameter sets); captured
        /// at track registration, never written as a timed sample.
        const CODEC_CONFIG = 0x0002;
        /// Marks the final buffer of a stream.
        const END_OF_STREAM = 0x0004;
    }
}

/// Which container track a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// An encoded sample produced by a codec, consumed exactly once by the
/// muxer (or stripped if it is a codec-config marker).
#[derive(Debug, Clone)]
pub struct EncodedSample {
    pub data: Vec<u8>,
    /// Presentation timestamp in microseconds, non-decreasing per track.
    pub pts_us: i64,
    pub flags: SampleFlags,
    pub track: TrackKind,
}

/// Declared format of a container track, registered with the muxer before
/// any sample for the track may be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackFormat {
    Video {
        width: u32,
        height: u32,
        /// Codec configuration captured at registration (e.g. SPS/PPS).
        codec_data: Vec<u8>,
    },
    Audio {
        sample_rate: u32,
        channels: u16,
        codec_data: Vec<u8>,
    },
}

impl TrackFormat {
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        match self {
            TrackFormat::Video { .. } => TrackKind::Video,
            TrackFormat::Audio { .. } => TrackKind::Audio,
        }
    }
}

/// Container-level rotation metadata, normalized to the four legal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Maps arbitrary degree values onto the four container rotations.
    /// Anything that is not a multiple of 90 falls back to no rotation.
    #[must_use]
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    #[must_use]
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Whether normalizing this rotation swaps width and height.
    #[must_use]
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Container-level facts about the source video, probed once and used to
/// size every downstream buffer. Immutable once resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    /// Stored (pre-rotation) width in pixels.
    pub width: u32,
    /// Stored (pre-rotation) height in pixels.
    pub height: u32,
    /// Duration in microseconds; 0 when the container does not report one.
    pub duration_us: i64,
    /// Frames per second.
    pub frame_rate: f32,
    pub rotation: Rotation,
}

impl VideoMetadata {
    /// Display dimensions after rotation normalization: 90/270 swap the
    /// probed pair, 0/180 keep it.
    #[must_use]
    pub fn normalized_dimensions(&self) -> (u32, u32) {
        if self.rotation.swaps_dimensions() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Presentation time of one frame in microseconds.
    #[must_use]
    pub fn frame_time_us(&self) -> i64 {
        (1_000_000.0 / f64::from(self.frame_rate.max(1.0))) as i64
    }

    /// Number of frames the transcode loop will process. Zero when the
    /// container reports no duration (nothing to iterate).
    #[must_use]
    pub fn frame_budget(&self) -> u64 {
        if self.duration_us <= 0 {
            return 0;
        }
        let frames = (self.duration_us as f64 / 1_000_000.0) * f64::from(self.frame_rate);
        frames.round().max(1.0) as u64
    }

    /// Frame count used to scale progress. Falls back to 100 when the
    /// duration is unknown so progress still advances.
    #[must_use]
    pub fn estimated_total_frames(&self) -> u64 {
        match self.frame_budget() {
            0 => 100,
            frames => frames,
        }
    }
}

/// A decoded, timestamped RGB frame with orientation already normalized to
/// upright. Owned exclusively by the iteration step that produced it and
/// destroyed once packed into YUV form.
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    /// Presentation timestamp in microseconds.
    pub pts_us: i64,
    /// Interleaved 8-bit RGB, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Allocates a black frame of the given dimensions.
    #[must_use]
    pub fn black(width: u32, height: u32, pts_us: i64) -> Self {
        Self {
            width,
            height,
            pts_us,
            data: vec![0; (width * height * 3) as usize],
        }
    }

    /// Reads the pixel at (x, y). Coordinates outside the frame clamp to
    /// the nearest edge pixel.
    #[must_use]
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let idx = ((y * self.width + x) * 3) as usize;
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }
}
