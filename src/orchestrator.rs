//! End-to-end transcode orchestration.
//!
//! Owns the full lifecycle of one run: probe the source, decide the audio
//! strategy, precompute the processed audio track, drive the per-timestamp
//! redaction and encode loop, remux audio, finalize the container, promote
//! the temporary file to its destination and hand it to the publish
//! capability. The whole sequence executes on the calling thread; progress
//! and the result cross to the caller through the channel and return
//! value. Cancellation is checked at every loop boundary.

use crate::cancel::CancellationToken;
use crate::capability::{filter_by_confidence, FaceLocator, FrameRedactor, Publisher};
use crate::config::RedactionConfig;
use crate::error::{CoreError, CoreResult};
use crate::media::codec::{FrameSource, SampleSource};
use crate::media::mux::MuxSession;
use crate::media::probe::{resolve_metadata, MetadataProbe};
use crate::media::{EncodedSample, MediaBackend, TrackFormat, TrackKind};
use crate::pipeline::{prepare_audio_track, AudioPlan, VideoEncodePipeline};
use crate::pixel::pack_yuv420;
use crate::progress::ProgressSender;
use crate::temp_files::{create_temp_dir, create_temp_file};
use crate::utils::{format_bytes, format_duration};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Progress is reported every this many processed frames.
const PROGRESS_STRIDE: u64 = 5;

/// Outcome of the audio stage, surfaced to the caller rather than failing
/// the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioStatus {
    /// The processed audio track was muxed into the output.
    Included,
    /// The source carried no audio track.
    Missing,
    /// The audio stage failed; the output is video-only.
    Degraded { reason: String },
}

/// Result of a completed transcode run.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeOutcome {
    pub output_path: PathBuf,
    pub frames_processed: u64,
    /// Frames in which at least one region met the confidence threshold
    /// and was redacted. Detection is probabilistic; callers must not
    /// assume full coverage.
    pub frames_redacted: u64,
    pub audio: AudioStatus,
    pub elapsed: Duration,
}

/// Runs one full redaction transcode.
///
/// On success the finished container sits at `output_path` and has been
/// handed to `publisher`. On any error (including cancellation) all
/// temporary artifacts are deleted and `publisher` is never invoked.
#[allow(clippy::too_many_arguments)]
pub fn process_video<B, L, R, P>(
    backend: &B,
    locator: &mut L,
    redactor: &mut R,
    publisher: &mut P,
    config: &RedactionConfig,
    input: &Path,
    output_path: &Path,
    progress: &mut ProgressSender,
    cancel: &CancellationToken,
) -> CoreResult<TranscodeOutcome>
where
    B: MediaBackend,
    L: FaceLocator,
    R: FrameRedactor,
    P: Publisher,
{
    config.validate()?;
    cancel.check()?;
    let run_start = Instant::now();
    progress.report(0.0, "Initializing");

    // ---- Probe ----
    let facts = backend.open_probe(input)?.probe()?;
    let metadata = resolve_metadata(&facts);
    let (target_width, target_height) = metadata.normalized_dimensions();
    log::info!(
        "source: {}x{} rotated {} deg, {} @ {:.2} fps -> target {}x{}",
        metadata.width,
        metadata.height,
        metadata.rotation.degrees(),
        format_duration(metadata.duration_us as f64 / 1_000_000.0),
        metadata.frame_rate,
        target_width,
        target_height
    );

    // Run-scoped temp directory; Drop removes it and everything inside on
    // every exit path.
    let temp_base = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    let temp_dir = create_temp_dir(&temp_base, "shroud")?;

    progress.report(5.0, "Processing frames");

    // ---- Audio stage (precomputed; failure degrades, never aborts) ----
    let plan = AudioPlan::for_semitones(config.pitch_shift_semitones);
    let mut audio_status = AudioStatus::Missing;
    let audio_artifact =
        match prepare_audio_track(backend, input, plan, temp_dir.path(), cancel) {
            Ok(artifact) => artifact,
            Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
            Err(err) => {
                log::warn!("audio stage failed, continuing video-only: {err}");
                audio_status = AudioStatus::Degraded {
                    reason: err.to_string(),
                };
                None
            }
        };

    let mut audio_remux: Option<(B::Source, TrackFormat)> = match &audio_artifact {
        Some(path) => match open_audio_remux(backend, path) {
            Ok(Some(pair)) => Some(pair),
            Ok(None) => {
                log::warn!("audio artifact carries no track, continuing video-only");
                audio_status = AudioStatus::Degraded {
                    reason: "processed audio artifact carries no track".to_string(),
                };
                None
            }
            Err(err) => {
                log::warn!("audio artifact unreadable, continuing video-only: {err}");
                audio_status = AudioStatus::Degraded {
                    reason: err.to_string(),
                };
                None
            }
        },
        None => None,
    };

    // ---- Container and video pipeline ----
    let temp_output = create_temp_file(temp_dir.path(), "shroud_out", "mp4")?;
    let sink = backend.create_container(temp_output.path())?;
    let mut session = MuxSession::new(sink);

    let encoder = backend.create_video_encoder()?;
    let mut pipeline = VideoEncodePipeline::configure(encoder, &metadata)?;
    pipeline.await_format(&mut session, cancel)?;

    let mut registration_failed = false;
    if let Some((_, format)) = &audio_remux {
        if let Err(err) = session.register_audio(format) {
            log::warn!("audio track registration failed, continuing video-only: {err}");
            audio_status = AudioStatus::Degraded {
                reason: err.to_string(),
            };
            registration_failed = true;
        }
    }
    if registration_failed {
        audio_remux = None;
    }
    session.start()?;

    // ---- Frame loop ----
    let mut frames = backend.open_frame_source(input, &metadata)?;
    let frame_time_us = metadata.frame_time_us();
    let frame_budget = metadata.frame_budget();
    let estimated_total = metadata.estimated_total_frames().max(1);
    let mut processed: u64 = 0;
    let mut redacted: u64 = 0;

    for frame_index in 0..frame_budget {
        cancel.check()?;
        let pts_us = frame_index as i64 * frame_time_us;
        let Some(frame) = frames.frame_at(pts_us)? else {
            continue;
        };

        let frame = if config.detect_faces {
            let regions = locator.locate(&frame, 0)?;
            let regions = filter_by_confidence(regions, config.confidence_threshold);
            if regions.is_empty() {
                frame
            } else {
                redacted += 1;
                redactor.redact(&frame, &regions)?
            }
        } else {
            frame
        };

        let yuv = pack_yuv420(&frame, target_width, target_height);
        drop(frame);
        pipeline.submit_frame(&yuv, &mut session)?;
        processed += 1;

        if processed % PROGRESS_STRIDE == 0 {
            let percent = 5.0 + (processed as f32 / estimated_total as f32) * 90.0;
            progress.report(percent.min(95.0), format!("Processed {processed} frames"));
        }
    }

    pipeline.finish(&mut session, cancel)?;

    // ---- Audio remux ----
    if let Some((source, _)) = &mut audio_remux {
        let mut copied: u64 = 0;
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
        log::debug!("remuxed {copied} audio samples");
        audio_status = AudioStatus::Included;
    }

    session.finish()?;

    // ---- Promote and publish ----
    temp_output
        .persist(output_path)
        .map_err(|err| CoreError::Io(err.error))?;
    if let Ok(meta) = std::fs::metadata(output_path) {
        log::info!(
            "output ready: {} ({})",
            output_path.display(),
            format_bytes(meta.len())
        );
    }
    publisher.publish(output_path)?;
    progress.complete();

    Ok(TranscodeOutcome {
        output_path: output_path.to_path_buf(),
        frames_processed: processed,
        frames_redacted: redacted,
        audio: audio_status,
        elapsed: run_start.elapsed(),
    })
}

fn open_audio_remux<B: MediaBackend>(
    backend: &B,
    artifact: &Path,
) -> CoreResult<Option<(B::Source, TrackFormat)>> {
    let mut source = backend.open_sample_source(artifact)?;
    Ok(source.select_audio_track()?.map(|format| (source, format)))
}
