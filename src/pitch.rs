//! Duration-preserving pitch shifting.
//!
//! A small time-domain shifter with a streaming surface: push interleaved
//! 16-bit PCM in, read shifted PCM out, flush at end of stream. Processing
//! is block-based and each full input block yields an output block of the
//! same frame count, so playback speed and duration are invariant by
//! construction; only spectral pitch changes. Within a block the signal is
//! re-read at the pitch ratio with linear interpolation, wrapping with a
//! short crossfade when the ratio exceeds 1.

use std::collections::VecDeque;

/// Frames per processing block.
const BLOCK_FRAMES: usize = 2048;

/// Frames of crossfade applied after a read-pointer wrap.
const SEAM_FADE_FRAMES: usize = 64;

/// Audio re-encode profile. Speed and rate are fixed at 1.0 and therefore
/// not represented; only the pitch ratio varies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchProfile {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frequency scale factor, `2^(semitones / 12)`.
    pub pitch: f32,
}

impl PitchProfile {
    #[must_use]
    pub fn from_semitones(sample_rate: u32, channels: u16, semitones: f32) -> Self {
        Self {
            sample_rate,
            channels,
            pitch: 2f32.powf(semitones / 12.0),
        }
    }
}

/// Streaming pitch shifter over interleaved `i16` PCM.
pub struct PitchShifter {
    channels: usize,
    pitch: f64,
    input: Vec<i16>,
    output: VecDeque<i16>,
}

impl PitchShifter {
    #[must_use]
    pub fn new(profile: &PitchProfile) -> Self {
        Self {
            channels: usize::from(profile.channels.max(1)),
            pitch: f64::from(profile.pitch),
            input: Vec::new(),
            output: VecDeque::new(),
        }
    }

    /// Pushes interleaved samples into the shifter. Complete blocks are
    /// processed immediately; a trailing partial block is held until more
    /// input arrives or [`flush`](Self::flush) is called.
    pub fn write_samples(&mut self, samples: &[i16]) {
        self.input.extend_from_slice(samples);
        while self.input.len() / self.channels >= BLOCK_FRAMES {
            self.process_block(BLOCK_FRAMES);
        }
    }

    /// Processes whatever partial block remains. Call once, at end of
    /// stream, so buffered samples are emitted.
    pub fn flush(&mut self) {
        let frames = self.input.len() / self.channels;
        if frames > 0 {
            self.process_block(frames);
        }
        self.input.clear();
    }

    /// Number of interleaved samples ready to read.
    #[must_use]
    pub fn samples_available(&self) -> usize {
        self.output.len()
    }

    /// Copies up to `out.len()` shifted samples into `out`, truncated to a
    /// whole number of frames. Returns the count copied.
    pub fn read_samples(&mut self, out: &mut [i16]) -> usize {
        let mut take = out.len().min(self.output.len());
        take -= take % self.channels;
        for slot in out.iter_mut().take(take) {
            // Length checked above.
            *slot = self.output.pop_front().unwrap_or(0);
        }
        take
    }

    fn process_block(&mut self, frames: usize) {
        let channels = self.channels;
        let block: Vec<i16> = self.input.drain(..frames * channels).collect();

        if (self.pitch - 1.0).abs() < 1e-9 {
            self.output.extend(block);
            return;
        }

        let span = frames as f64;
        let fade = SEAM_FADE_FRAMES.min(frames / 4).max(1) as f64;
        for n in 0..frames {
            let raw = n as f64 * self.pitch;
            let lap = (raw / span) as usize;
            let pos = raw - lap as f64 * span;
            for ch in 0..channels {
                let mut sample = sample_at(&block, frames, channels, pos, ch);
                // Blend out of the previous lap's tail right after a wrap
                // to hide the seam.
                if lap > 0 && pos < fade {
                    let t = pos / fade;
                    let tail_pos = (span - fade + pos).min(span - 1.0);
                    let tail = sample_at(&block, frames, channels, tail_pos, ch);
                    sample = tail * (1.0 - t) + sample * t;
                }
                self.output
                    .push_back(sample.round().clamp(-32768.0, 32767.0) as i16);
            }
        }
    }
}

/// Linear interpolation within a block at fractional frame position `pos`.
fn sample_at(block: &[i16], frames: usize, channels: usize, pos: f64, ch: usize) -> f64 {
    let i0 = (pos.floor() as usize).min(frames - 1);
    let i1 = (i0 + 1).min(frames - 1);
    let frac = pos - i0 as f64;
    let a = f64::from(block[i0 * channels + ch]);
    let b = f64::from(block[i1 * channels + ch]);
    a + (b - a) * frac
}
