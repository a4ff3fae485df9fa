//! Shared scripted fakes driving the codec, extraction and container seams.
//!
//! `FakeBackend` hands out deterministic components and records every
//! container written through it in a shared registry, so tests can replay
//! an artifact written by one stage (the audio pre-pass) through another
//! (the final remux) exactly like the real backend would.

#![allow(dead_code)]

use shroud::cancel::CancellationToken;
use shroud::capability::{DetectionRegion, FaceLocator, FrameRedactor, Publisher};
use shroud::error::{CoreError, CoreResult};
use shroud::media::codec::{
    AudioDecoder, AudioEncoder, AudioEncoderConfig, ColorFormat, DequeuedOutput, FrameSource,
    OutputBuffer, SampleSource, SourcePacket, VideoEncoder, VideoEncoderConfig,
};
use shroud::media::mux::{ContainerSink, TrackId};
use shroud::media::probe::{MetadataProbe, ProbedFacts};
use shroud::media::{
    EncodedSample, MediaBackend, RgbFrame, SampleFlags, TrackFormat, TrackKind, VideoMetadata,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything written to one container sink, inspectable after the run.
#[derive(Debug, Clone, Default)]
pub struct ContainerRecord {
    pub tracks: Vec<TrackFormat>,
    pub samples: Vec<(usize, EncodedSample)>,
    pub started: bool,
    pub finished: bool,
}

impl ContainerRecord {
    pub fn track_index(&self, kind: TrackKind) -> Option<usize> {
        self.tracks.iter().position(|format| format.kind() == kind)
    }

    pub fn samples_for(&self, kind: TrackKind) -> Vec<EncodedSample> {
        match self.track_index(kind) {
            Some(index) => self
                .samples
                .iter()
                .filter(|(track, _)| *track == index)
                .map(|(_, sample)| sample.clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

pub type Registry = Arc<Mutex<HashMap<PathBuf, ContainerRecord>>>;

/// The source input's audio track as served by `FakeSampleSource`.
#[derive(Debug, Clone)]
pub struct SourceAudio {
    pub format: TrackFormat,
    pub packets: Vec<SourcePacket>,
}

/// Builds a stereo audio track whose packet payloads are raw PCM bytes
/// (the fake decoder echoes payloads, so this doubles as decoded output).
pub fn pcm_audio_track(sample_rate: u32, packets: usize, frames_per_packet: usize) -> SourceAudio {
    let channels = 2u16;
    let mut out = Vec::new();
    let mut frame_index = 0i64;
    for _ in 0..packets {
        let mut data = Vec::with_capacity(frames_per_packet * usize::from(channels) * 2);
        for _ in 0..frames_per_packet {
            let sample = ((frame_index % 200) - 100) as i16 * 80;
            data.extend_from_slice(&sample.to_le_bytes());
            data.extend_from_slice(&(sample / 2).to_le_bytes());
            frame_index += 1;
        }
        let pts_us = (frame_index - frames_per_packet as i64) * 1_000_000
            / i64::from(sample_rate);
        out.push(SourcePacket {
            data,
            pts_us,
            flags: SampleFlags::empty(),
        });
    }
    SourceAudio {
        format: TrackFormat::Audio {
            sample_rate,
            channels,
            codec_data: vec![0x12, 0x10],
        },
        packets: out,
    }
}

/// Backend factory handing out scripted components.
#[derive(Clone)]
pub struct FakeBackend {
    pub facts: ProbedFacts,
    pub source_audio: Option<SourceAudio>,
    pub containers: Registry,
    pub fail_probe: bool,
    pub fail_audio_decoder: bool,
    pub reject_semi_planar: bool,
    pub reject_all_formats: bool,
    pub never_report_format: bool,
    pub skew_first_output: bool,
    /// Frame indices (in submission order) whose output buffer reports a
    /// negative timestamp.
    pub negative_pts_frames: Vec<u64>,
    /// Cancels the token after this many frames have been decoded.
    pub cancel_after_frames: Option<(u64, CancellationToken)>,
    /// Every video encoder configuration attempt, in order.
    pub video_configs: Arc<Mutex<Vec<VideoEncoderConfig>>>,
    /// PCM frames accepted by audio encoders.
    pub audio_pcm_frames: Arc<Mutex<u64>>,
}

impl FakeBackend {
    pub fn new(facts: ProbedFacts) -> Self {
        Self {
            facts,
            source_audio: None,
            containers: Arc::new(Mutex::new(HashMap::new())),
            fail_probe: false,
            fail_audio_decoder: false,
            reject_semi_planar: false,
            reject_all_formats: false,
            never_report_format: false,
            skew_first_output: false,
            negative_pts_frames: Vec::new(),
            cancel_after_frames: None,
            video_configs: Arc::new(Mutex::new(Vec::new())),
            audio_pcm_frames: Arc::new(Mutex::new(0)),
        }
    }

    /// Probe facts for a 64x36, 2 second, 30 fps source.
    pub fn standard_facts() -> ProbedFacts {
        ProbedFacts {
            width: Some(64),
            height: Some(36),
            duration_us: Some(2_000_000),
            capture_frame_rate: Some(30.0),
            ..Default::default()
        }
    }

    pub fn record_at(&self, path: &Path) -> Option<ContainerRecord> {
        self.containers.lock().unwrap().get(path).cloned()
    }

    /// The one container holding a video track (the transcode output).
    pub fn video_container(&self) -> Option<ContainerRecord> {
        self.containers
            .lock()
            .unwrap()
            .values()
            .find(|record| record.track_index(TrackKind::Video).is_some())
            .cloned()
    }

    /// The audio-only artifact written by the audio pre-pass.
    pub fn audio_artifact(&self) -> Option<ContainerRecord> {
        self.containers
            .lock()
            .unwrap()
            .values()
            .find(|record| {
                record.track_index(TrackKind::Video).is_none()
                    && record.track_index(TrackKind::Audio).is_some()
            })
            .cloned()
    }
}

impl MediaBackend for FakeBackend {
    type Probe = FakeProbe;
    type Frames = FakeFrameSource;
    type VideoEnc = FakeVideoEncoder;
    type AudioDec = FakeAudioDecoder;
    type AudioEnc = FakeAudioEncoder;
    type Source = FakeSampleSource;
    type Sink = FakeContainerSink;

    fn open_probe(&self, _input: &Path) -> CoreResult<Self::Probe> {
        Ok(FakeProbe {
            facts: self.facts.clone(),
            fail: self.fail_probe,
        })
    }

    fn open_frame_source(
        &self,
        _input: &Path,
        metadata: &VideoMetadata,
    ) -> CoreResult<Self::Frames> {
        let (width, height) = metadata.normalized_dimensions();
        Ok(FakeFrameSource {
            width,
            height,
            served: 0,
            cancel_after: self.cancel_after_frames.clone(),
        })
    }

    fn create_video_encoder(&self) -> CoreResult<Self::VideoEnc> {
        Ok(FakeVideoEncoder {
            reject_semi_planar: self.reject_semi_planar,
            reject_all_formats: self.reject_all_formats,
            never_report_format: self.never_report_format,
            skew_first_output: self.skew_first_output,
            negative_pts_frames: self.negative_pts_frames.clone(),
            configs: self.video_configs.clone(),
            config: None,
            pending: VecDeque::new(),
            frames_queued: 0,
        })
    }

    fn create_audio_decoder(&self, _format: &TrackFormat) -> CoreResult<Self::AudioDec> {
        if self.fail_audio_decoder {
            return Err(CoreError::Initialization(
                "no decoder for audio format".to_string(),
            ));
        }
        Ok(FakeAudioDecoder {
            pending: VecDeque::new(),
        })
    }

    fn create_audio_encoder(&self) -> CoreResult<Self::AudioEnc> {
        Ok(FakeAudioEncoder {
            config: None,
            pending: VecDeque::new(),
            pcm_frames: self.audio_pcm_frames.clone(),
        })
    }

    fn open_sample_source(&self, input: &Path) -> CoreResult<Self::Source> {
        if let Some(record) = self.containers.lock().unwrap().get(input) {
            let format = record
                .track_index(TrackKind::Audio)
                .map(|index| record.tracks[index].clone());
            let packets = record
                .samples_for(TrackKind::Audio)
                .into_iter()
                .map(|sample| SourcePacket {
                    data: sample.data,
                    pts_us: sample.pts_us,
                    flags: sample.flags,
                })
                .collect();
            return Ok(FakeSampleSource { format, packets });
        }
        match &self.source_audio {
            Some(audio) => Ok(FakeSampleSource {
                format: Some(audio.format.clone()),
                packets: audio.packets.clone().into(),
            }),
            None => Ok(FakeSampleSource {
                format: None,
                packets: VecDeque::new(),
            }),
        }
    }

    fn create_container(&self, output: &Path) -> CoreResult<Self::Sink> {
        self.containers
            .lock()
            .unwrap()
            .insert(output.to_path_buf(), ContainerRecord::default());
        Ok(FakeContainerSink {
            path: output.to_path_buf(),
            registry: self.containers.clone(),
        })
    }
}

pub struct FakeProbe {
    facts: ProbedFacts,
    fail: bool,
}

impl MetadataProbe for FakeProbe {
    fn probe(&mut self) -> CoreResult<ProbedFacts> {
        if self.fail {
            return Err(CoreError::Initialization("unreadable source".to_string()));
        }
        Ok(self.facts.clone())
    }
}

pub struct FakeFrameSource {
    width: u32,
    height: u32,
    served: u64,
    cancel_after: Option<(u64, CancellationToken)>,
}

impl FrameSource for FakeFrameSource {
    fn frame_at(&mut self, pts_us: i64) -> CoreResult<Option<RgbFrame>> {
        self.served += 1;
        if let Some((limit, token)) = &self.cancel_after {
            if self.served > *limit {
                token.cancel();
            }
        }
        let mut frame = RgbFrame::black(self.width, self.height, pts_us);
        for pixel in frame.data.chunks_exact_mut(3) {
            pixel[0] = 200;
            pixel[1] = 120;
            pixel[2] = 40;
        }
        Ok(Some(frame))
    }
}

pub struct FakeVideoEncoder {
    reject_semi_planar: bool,
    reject_all_formats: bool,
    never_report_format: bool,
    skew_first_output: bool,
    negative_pts_frames: Vec<u64>,
    configs: Arc<Mutex<Vec<VideoEncoderConfig>>>,
    config: Option<VideoEncoderConfig>,
    pending: VecDeque<DequeuedOutput>,
    frames_queued: u64,
}

impl VideoEncoder for FakeVideoEncoder {
    fn configure(&mut self, config: &VideoEncoderConfig) -> CoreResult<()> {
        self.configs.lock().unwrap().push(config.clone());
        if self.reject_all_formats
            || (self.reject_semi_planar && config.color_format == ColorFormat::Yuv420SemiPlanar)
        {
            return Err(CoreError::CodecConfiguration(format!(
                "color format {:?} unsupported",
                config.color_format
            )));
        }
        self.config = Some(config.clone());
        self.pending.clear();
        if !self.never_report_format {
            // Real encoders surface parameter sets before the format event.
            self.pending.push_back(DequeuedOutput::Buffer(OutputBuffer {
                data: vec![0, 0, 0, 1, 0x67],
                pts_us: 0,
                flags: SampleFlags::CODEC_CONFIG,
            }));
            self.pending
                .push_back(DequeuedOutput::FormatChanged(TrackFormat::Video {
                    width: config.width,
                    height: config.height,
                    codec_data: vec![0x67, 0x68],
                }));
        }
        Ok(())
    }

    fn queue_input(
        &mut self,
        data: &[u8],
        pts_us: i64,
        flags: SampleFlags,
        _timeout: Duration,
    ) -> CoreResult<bool> {
        if flags.contains(SampleFlags::END_OF_STREAM) {
            self.pending.push_back(DequeuedOutput::Buffer(OutputBuffer {
                data: Vec::new(),
                pts_us,
                flags: SampleFlags::END_OF_STREAM,
            }));
            return Ok(true);
        }
        let (mut out_pts, out_flags) = if self.frames_queued == 0 && self.skew_first_output {
            // A misbehaving encoder: late timestamp, no key-frame flag.
            (pts_us + 1_500, SampleFlags::empty())
        } else {
            (pts_us, flags & SampleFlags::KEY_FRAME)
        };
        if self.negative_pts_frames.contains(&self.frames_queued) {
            out_pts = -33_000;
        }
        self.frames_queued += 1;
        self.pending.push_back(DequeuedOutput::Buffer(OutputBuffer {
            data: vec![0xAB; data.len().min(16).max(1)],
            pts_us: out_pts,
            flags: out_flags,
        }));
        Ok(true)
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> CoreResult<DequeuedOutput> {
        Ok(self.pending.pop_front().unwrap_or(DequeuedOutput::TryAgain))
    }

    fn stop(&mut self) {}
}

pub struct FakeAudioDecoder {
    pending: VecDeque<DequeuedOutput>,
}

impl AudioDecoder for FakeAudioDecoder {
    fn queue_input(
        &mut self,
        data: &[u8],
        pts_us: i64,
        flags: SampleFlags,
        _timeout: Duration,
    ) -> CoreResult<bool> {
        if flags.contains(SampleFlags::END_OF_STREAM) {
            self.pending.push_back(DequeuedOutput::Buffer(OutputBuffer {
                data: Vec::new(),
                pts_us,
                flags: SampleFlags::END_OF_STREAM,
            }));
        } else {
            // Packets in these tests carry PCM payloads already.
            self.pending.push_back(DequeuedOutput::Buffer(OutputBuffer {
                data: data.to_vec(),
                pts_us,
                flags: SampleFlags::empty(),
            }));
        }
        Ok(true)
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> CoreResult<DequeuedOutput> {
        Ok(self.pending.pop_front().unwrap_or(DequeuedOutput::TryAgain))
    }

    fn stop(&mut self) {}
}

pub struct FakeAudioEncoder {
    config: Option<AudioEncoderConfig>,
    pending: VecDeque<DequeuedOutput>,
    pcm_frames: Arc<Mutex<u64>>,
}

impl AudioEncoder for FakeAudioEncoder {
    fn configure(&mut self, config: &AudioEncoderConfig) -> CoreResult<()> {
        self.pending
            .push_back(DequeuedOutput::FormatChanged(TrackFormat::Audio {
                sample_rate: config.sample_rate,
                channels: config.channels,
                codec_data: vec![0x12, 0x10],
            }));
        self.config = Some(config.clone());
        Ok(())
    }

    fn queue_input(
        &mut self,
        data: &[u8],
        pts_us: i64,
        flags: SampleFlags,
        _timeout: Duration,
    ) -> CoreResult<bool> {
        if flags.contains(SampleFlags::END_OF_STREAM) {
            self.pending.push_back(DequeuedOutput::Buffer(OutputBuffer {
                data: Vec::new(),
                pts_us,
                flags: SampleFlags::END_OF_STREAM,
            }));
            return Ok(true);
        }
        let channels = self
            .config
            .as_ref()
            .map(|c| usize::from(c.channels.max(1)))
            .unwrap_or(1);
        *self.pcm_frames.lock().unwrap() += (data.len() / 2 / channels) as u64;
        self.pending.push_back(DequeuedOutput::Buffer(OutputBuffer {
            data: data.to_vec(),
            pts_us,
            flags: SampleFlags::empty(),
        }));
        Ok(true)
    }

    fn dequeue_output(&mut self, _timeout: Duration) -> CoreResult<DequeuedOutput> {
        Ok(self.pending.pop_front().unwrap_or(DequeuedOutput::TryAgain))
    }

    fn stop(&mut self) {}
}

pub struct FakeSampleSource {
    format: Option<TrackFormat>,
    packets: VecDeque<SourcePacket>,
}

impl SampleSource for FakeSampleSource {
    fn select_audio_track(&mut self) -> CoreResult<Option<TrackFormat>> {
        Ok(self.format.clone())
    }

    fn next_packet(&mut self) -> CoreResult<Option<SourcePacket>> {
        Ok(self.packets.pop_front())
    }
}

pub struct FakeContainerSink {
    path: PathBuf,
    registry: Registry,
}

impl FakeContainerSink {
    fn with_record<T>(&self, f: impl FnOnce(&mut ContainerRecord) -> T) -> T {
        let mut registry = self.registry.lock().unwrap();
        let record = registry.entry(self.path.clone()).or_default();
        f(record)
    }
}

impl ContainerSink for FakeContainerSink {
    fn add_track(&mut self, format: &TrackFormat) -> CoreResult<TrackId> {
        self.with_record(|record| {
            record.tracks.push(format.clone());
            Ok(TrackId(record.tracks.len() - 1))
        })
    }

    fn start(&mut self) -> CoreResult<()> {
        self.with_record(|record| {
            record.started = true;
            Ok(())
        })
    }

    fn write_sample(&mut self, track: TrackId, sample: &EncodedSample) -> CoreResult<()> {
        self.with_record(|record| {
            record.samples.push((track.0, sample.clone()));
            Ok(())
        })
    }

    fn finish(&mut self) -> CoreResult<()> {
        self.with_record(|record| {
            record.finished = true;
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct FakeLocator {
    /// Regions returned on matching calls.
    pub regions: Vec<DetectionRegion>,
    /// Return `regions` on every Nth call (0-based); 0 means never.
    pub every_nth: u64,
    pub calls: u64,
}

impl FaceLocator for FakeLocator {
    fn locate(
        &mut self,
        _frame: &RgbFrame,
        _orientation_hint: i32,
    ) -> CoreResult<Vec<DetectionRegion>> {
        let hit = self.every_nth > 0 && self.calls % self.every_nth == 0;
        self.calls += 1;
        Ok(if hit { self.regions.clone() } else { Vec::new() })
    }
}

#[derive(Default)]
pub struct FakeRedactor {
    pub calls: u64,
}

impl FrameRedactor for FakeRedactor {
    fn redact(&mut self, frame: &RgbFrame, _regions: &[DetectionRegion]) -> CoreResult<RgbFrame> {
        self.calls += 1;
        let mut redacted = frame.clone();
        for byte in &mut redacted.data {
            *byte = !*byte;
        }
        Ok(redacted)
    }
}

#[derive(Default)]
pub struct FakePublisher {
    pub published: Vec<PathBuf>,
    pub fail: bool,
}

impl Publisher for FakePublisher {
    fn publish(&mut self, output: &Path) -> CoreResult<()> {
        if self.fail {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "publish refused",
            )));
        }
        self.published.push(output.to_path_buf());
        Ok(())
    }
}

pub fn region(confidence: f32) -> DetectionRegion {
    DetectionRegion {
        x: 4,
        y: 4,
        width: 16,
        height: 16,
        confidence,
    }
}
