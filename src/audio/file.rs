use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use super::analyser::{AnalyserConfig, FrequencyAnalyser};
use super::backend::{CaptureBackend, CaptureStream};
use crate::error::CaptureError;

/// A decoded WAV file, mixed down to mono
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?
            }
        };

        let channels = spec.channels.max(1) as usize;
        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        let duration_seconds = samples.len() as f64 / spec.sample_rate as f64;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} frames",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Replays a WAV file in real time, looping, as if it were a microphone
pub struct FileBackend {
    path: PathBuf,
    analyser: AnalyserConfig,
}

impl FileBackend {
    pub fn new(path: PathBuf, analyser: AnalyserConfig) -> Self {
        Self { path, analyser }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn open_stream(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        self.analyser.validate()?;

        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .map_err(|e| CaptureError::Backend(format!("file reader failed: {}", e)))?
            .map_err(|e| {
                if self.path.exists() {
                    CaptureError::Backend(format!("{:#}", e))
                } else {
                    CaptureError::NoDevice
                }
            })?;

        if audio.samples.is_empty() || audio.sample_rate == 0 {
            return Err(CaptureError::Unsupported(format!(
                "{} contains no audio",
                audio.path
            )));
        }

        Ok(Box::new(FileStream::new(audio, self.analyser.clone())))
    }

    fn name(&self) -> &str {
        "WAV file replay"
    }
}

/// Looping replay position derived from wall-clock time since open
pub struct FileStream {
    audio: AudioFile,
    analyser: FrequencyAnalyser,
    fft_size: usize,
    opened_at: Instant,
    scratch: Vec<f32>,
    closed: bool,
}

impl FileStream {
    fn new(audio: AudioFile, config: AnalyserConfig) -> Self {
        info!("Replaying {} as capture input", audio.path);
        Self {
            fft_size: config.fft_size,
            scratch: Vec::with_capacity(config.fft_size),
            analyser: FrequencyAnalyser::new(config),
            opened_at: Instant::now(),
            closed: false,
            audio,
        }
    }

    fn fill_window(&mut self) {
        self.scratch.clear();
        let len = self.audio.samples.len();
        let elapsed = self.opened_at.elapsed().as_secs_f64();
        let position = (elapsed * self.audio.sample_rate as f64) as usize;

        // Window of fft_size samples ending at the playback position
        let start = position + len - (self.fft_size % len);
        for i in 0..self.fft_size {
            self.scratch.push(self.audio.samples[(start + i) % len]);
        }
    }
}

impl CaptureStream for FileStream {
    fn bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    fn read_frequency_energies(&mut self, bins: &mut [u8]) {
        if self.closed {
            bins.iter_mut().for_each(|b| *b = 0);
            return;
        }
        self.fill_window();
        self.analyser.byte_frequency_data(&self.scratch, bins);
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            info!("File replay closed: {}", self.audio.path);
        }
    }
}
