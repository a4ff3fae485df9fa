//! Audio pipeline.
//!
//! Produces a temporary audio-only container holding the processed track:
//! either a byte-preserving passthrough remux of the source's first audio
//! track, or a decode -> pitch-shift -> re-encode chain when a pitch shift
//! is requested. The whole processed track is precomputed before the main
//! mux; the orchestrator later copies its samples into the output session.
//!
//! Any failure here is non-fatal to the transcode: the orchestrator
//! degrades to video-only output and reports it in the final status.

use crate::cancel::CancellationToken;
use crate::error::{CoreError, CoreResult};
use crate::media::codec::{
    AudioDecoder, AudioEncoder, AudioEncoderConfig, DequeuedOutput, SampleSource, SourcePacket,
};
use crate::media::mux::{ContainerSink, MuxSession};
use crate::media::{EncodedSample, MediaBackend, SampleFlags, TrackFormat, TrackKind};
use crate::pitch::{PitchProfile, PitchShifter};
use crate::temp_files::create_temp_file;
use std::path::Path;
use std::time::Duration;
use tempfile::TempPath;

/// Fixed bit rate for re-encoded audio.
const ENCODE_BIT_RATE: u32 = 128_000;

/// PCM frames moved between shifter and encoder per chunk; small bounded
/// buffers, never the whole file.
const PCM_CHUNK_FRAMES: usize = 1024;

/// Bounded timeout for every codec dequeue call.
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(10);

/// Upper bound on streaming loop iterations; a stall beyond this is a
/// backend defect surfaced as an audio failure rather than a hang.
const LOOP_LIMIT: u64 = 4_000_000;

/// Audio strategy for a run, decided from the pitch-shift parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioPlan {
    /// Copy the source track verbatim.
    Passthrough,
    /// Decode, shift spectral pitch (duration preserved), re-encode.
    PitchShift { semitones: f32 },
}

impl AudioPlan {
    #[must_use]
    pub fn for_semitones(semitones: f32) -> Self {
        if semitones == 0.0 {
            AudioPlan::Passthrough
        } else {
            AudioPlan::PitchShift { semitones }
        }
    }
}

/// Processes the source's audio into a temporary artifact.
///
/// Returns `Ok(None)` when the source has no audio track. The returned
/// [`TempPath`] deletes the artifact when dropped, covering every exit
/// path of the orchestration.
pub fn prepare_audio_track<B: MediaBackend>(
    backend: &B,
    input: &Path,
    plan: AudioPlan,
    temp_dir: &Path,
    cancel: &CancellationToken,
) -> CoreResult<Option<TempPath>> {
    let mut source = backend.open_sample_source(input)?;
    let Some(format) = source.select_audio_track()? else {
        log::info!("source carries no audio track");
        return Ok(None);
    };

    let artifact = create_temp_file(temp_dir, "shroud_audio", "m4a")?.into_temp_path();
    let sink = backend.create_container(&artifact)?;

    match plan {
        AudioPlan::Passthrough => {
            log::debug!("audio passthrough extraction");
            copy_passthrough(&mut source, sink, &format, cancel)?;
        }
        AudioPlan::PitchShift { semitones } => {
            log::debug!("audio pitch shift: {semitones} semitones");
            let (sample_rate, channels) = match &format {
                TrackFormat::Audio {
                    sample_rate,
                    channels,
                    ..
                } => (*sample_rate, *channels),
                TrackFormat::Video { .. } => {
                    return Err(CoreError::Audio(
                        "selected audio track has non-audio format".to_string(),
                    ));
                }
            };
            let profile = PitchProfile::from_semitones(sample_rate, channels, semitones);
            let decoder = backend.create_audio_decoder(&format)?;
            let mut encoder = backend.create_audio_encoder()?;
            encoder.configure(&AudioEncoderConfig {
                sample_rate,
                channels,
                bit_rate: ENCODE_BIT_RATE,
            })?;
            pitch_shift_transcode(&mut source, decoder, encoder, &profile, sink, cancel)?;
        }
    }
    Ok(Some(artifact))
}

/// Copies every sample of the selected track into `sink` verbatim (size,
/// timestamp, flags), repackaging the container only.
fn copy_passthrough<X: SampleSource, S: ContainerSink>(
    source: &mut X,
    sink: S,
    format: &TrackFormat,
    cancel: &CancellationToken,
) -> CoreResult<()> {
    let mut session = MuxSession::new(sink);
    session.register_audio(format)?;
    session.start()?;

    let mut copied = 0u64;
    while let Some(packet) = source.next_packet()? {
        cancel.check()?;
        session.write(&EncodedSample {
            data: packet.data,
            pts_us: packet.pts_us,
            flags: packet.flags,
            track: TrackKind::Audio,
        })?;
        copied += 1;
    }
    log::debug!("copied {copied} audio samples");
    session.finish()
}

/// Streaming decode -> shift -> encode with small bounded buffers.
///
/// Encoded sample timestamps come from a running count of PCM frames
/// handed to the encoder (`total * 1_000_000 / sample_rate`), keeping
/// timing rate-accurate regardless of upstream buffering granularity.
/// Encoder end-of-stream is signalled only once the shifter has been
/// flushed and fully drained.
fn pitch_shift_transcode<X, D, E, S>(
    source: &mut X,
    mut decoder: D,
    mut encoder: E,
    profile: &PitchProfile,
    sink: S,
    cancel: &CancellationToken,
) -> CoreResult<()>
where
    X: SampleSource,
    D: AudioDecoder,
    E: AudioEncoder,
    S: ContainerSink,
{
    let mut session = MuxSession::new(sink);
    let mut shifter = PitchShifter::new(profile);
    let channels = usize::from(profile.channels.max(1));
    let sample_rate = i64::from(profile.sample_rate.max(1));

    let mut chunk = vec![0i16; PCM_CHUNK_FRAMES * channels];
    let mut pending_packet: Option<SourcePacket> = None;
    let mut pending_pcm: Vec<i16> = Vec::new();
    let mut source_done = false;
    let mut decoder_eos_sent = false;
    let mut shifter_flushed = false;
    let mut encoder_eos_sent = false;
    let mut output_done = false;
    let mut total_frames_encoded: i64 = 0;

    let mut iterations = 0u64;
    while !output_done {
        cancel.check()?;
        iterations += 1;
        if iterations > LOOP_LIMIT {
            return Err(CoreError::Audio("audio streaming loop stalled".to_string()));
        }

        // 1. Feed the decoder; an exhausted source submits end-of-stream.
        if !decoder_eos_sent {
            if pending_packet.is_none() && !source_done {
                pending_packet = source.next_packet()?;
                if pending_packet.is_none() {
                    source_done = true;
                }
            }
            if let Some(packet) = &pending_packet {
                if decoder.queue_input(&packet.data, packet.pts_us, packet.flags, DEQUEUE_TIMEOUT)? {
                    pending_packet = None;
                }
            } else if source_done
                && decoder.queue_input(&[], 0, SampleFlags::END_OF_STREAM, DEQUEUE_TIMEOUT)?
            {
                decoder_eos_sent = true;
            }
        }

        // 2. Drain decoded PCM into the shifter; decoder EOS flushes it.
        match decoder.dequeue_output(DEQUEUE_TIMEOUT)? {
            DequeuedOutput::Buffer(buffer) => {
                if !buffer.data.is_empty() {
                    shifter.write_samples(&bytes_to_pcm(&buffer.data));
                }
                if buffer.flags.contains(SampleFlags::END_OF_STREAM) && !shifter_flushed {
                    shifter.flush();
                    shifter_flushed = true;
                }
            }
            DequeuedOutput::FormatChanged(_) | DequeuedOutput::TryAgain => {}
        }

        // 3. Move shifted PCM into the encoder in bounded chunks.
        loop {
            if pending_pcm.is_empty() {
                let read = shifter.read_samples(&mut chunk);
                if read == 0 {
                    break;
                }
                pending_pcm.extend_from_slice(&chunk[..read]);
            }
            let pts_us = total_frames_encoded * 1_000_000 / sample_rate;
            if encoder.queue_input(
                &pcm_to_bytes(&pending_pcm),
                pts_us,
                SampleFlags::empty(),
                DEQUEUE_TIMEOUT,
            )? {
                total_frames_encoded += (pending_pcm.len() / channels) as i64;
                pending_pcm.clear();
            } else {
                break;
            }
        }

        // 4. Encoder end-of-stream once the shifter is flushed and empty.
        if shifter_flushed
            && shifter.samples_available() == 0
            && pending_pcm.is_empty()
            && !encoder_eos_sent
            && encoder.queue_input(&[], 0, SampleFlags::END_OF_STREAM, DEQUEUE_TIMEOUT)?
        {
            encoder_eos_sent = true;
            log::debug!("audio encoder EOS sent after {total_frames_encoded} frames");
        }

        // 5. Drain the encoder into the artifact container.
        loop {
            match encoder.dequeue_output(DEQUEUE_TIMEOUT)? {
                DequeuedOutput::FormatChanged(format) => {
                    session.register_audio(&format)?;
                    session.start()?;
                }
                DequeuedOutput::Buffer(buffer) => {
                    let end_of_stream = buffer.flags.contains(SampleFlags::END_OF_STREAM);
                    session.write(&EncodedSample {
                        data: buffer.data,
                        pts_us: buffer.pts_us,
                        flags: buffer.flags,
                        track: TrackKind::Audio,
                    })?;
                    if end_of_stream {
                        output_done = true;
                        break;
                    }
                }
                DequeuedOutput::TryAgain => break,
            }
        }
    }

    decoder.stop();
    encoder.stop();
    session.finish()
}

/// Reinterprets little-endian bytes as interleaved `i16` PCM.
fn bytes_to_pcm(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Serializes interleaved `i16` PCM to little-endian bytes.
fn pcm_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}
