use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::{AnalyserConfig, CaptureSource};
use crate::export::CsvExporter;
use crate::noise::SamplerConfig;

/// Default location of the optional config file
pub const DEFAULT_CONFIG_PATH: &str = "config/quiet-read.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub session: SessionDefaults,
    pub audio: AudioConfig,
    pub alert: AlertConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionDefaults {
    pub default_minutes: u32,
    pub default_sensitivity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSourceKind {
    Microphone,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub source: AudioSourceKind,
    pub file_path: Option<String>,
    pub fft_size: usize,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub smoothing_time_constant: f32,
    pub sample_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    pub enabled: bool,
    pub sound_path: Option<String>,
    pub volume: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub directory: String,
    pub filename: String,
    pub timestamp_format: String,
    pub include_bom: bool,
}

impl Config {
    /// Defaults, then `path` if it exists, then `QUIET_READ__*` variables
    pub fn load(path: &str) -> Result<Self> {
        Self::build(Some(path))
    }

    /// Built-in defaults plus environment overrides
    pub fn defaults() -> Result<Self> {
        Self::build(None)
    }

    fn build(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("service.name", "quiet-read")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 7878)?
            .set_default("session.default_minutes", 10)?
            .set_default("session.default_sensitivity", 100)?
            .set_default("audio.source", "microphone")?
            .set_default("audio.fft_size", 512)?
            .set_default("audio.min_decibels", -90.0)?
            .set_default("audio.max_decibels", -10.0)?
            .set_default("audio.smoothing_time_constant", 0.85)?
            .set_default("audio.sample_interval_ms", 16)?
            .set_default("alert.enabled", true)?
            .set_default("alert.volume", 0.5)?
            .set_default("export.directory", ".")?
            .set_default("export.filename", "noise-log.csv")?
            .set_default("export.timestamp_format", "%Y-%m-%d %H:%M:%S")?
            .set_default("export.include_bom", true)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("QUIET_READ")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| {
                format!(
                    "Failed to load configuration from {}",
                    path.unwrap_or("defaults")
                )
            })?;

        let config: Self = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.analyser()
            .validate()
            .context("Invalid [audio] analyser settings")?;
        if self.audio.source == AudioSourceKind::File && self.audio.file_path.is_none() {
            anyhow::bail!("audio.source = \"file\" requires audio.file_path");
        }
        if !(1..=100).contains(&self.session.default_sensitivity) {
            anyhow::bail!(
                "session.default_sensitivity must be between 1 and 100, got {}",
                self.session.default_sensitivity
            );
        }
        Ok(())
    }

    pub fn analyser(&self) -> AnalyserConfig {
        AnalyserConfig {
            fft_size: self.audio.fft_size,
            min_decibels: self.audio.min_decibels,
            max_decibels: self.audio.max_decibels,
            smoothing_time_constant: self.audio.smoothing_time_constant,
        }
    }

    pub fn sampler(&self) -> SamplerConfig {
        SamplerConfig {
            sample_interval: Duration::from_millis(self.audio.sample_interval_ms.max(1)),
        }
    }

    pub fn capture_source(&self) -> CaptureSource {
        match (&self.audio.source, &self.audio.file_path) {
            (AudioSourceKind::File, Some(path)) => CaptureSource::File(PathBuf::from(path)),
            _ => CaptureSource::Microphone,
        }
    }

    pub fn exporter(&self) -> CsvExporter {
        CsvExporter::new(
            self.export.timestamp_format.clone(),
            self.export.include_bom,
        )
    }

    pub fn export_path(&self) -> PathBuf {
        Path::new(&self.export.directory).join(&self.export.filename)
    }

    pub fn alert_sound(&self) -> Option<PathBuf> {
        self.alert.sound_path.as_ref().map(PathBuf::from)
    }
}
