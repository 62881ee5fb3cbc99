use std::path::PathBuf;

use tracing::info;

use super::analyser::AnalyserConfig;
use super::file::FileBackend;
use super::microphone::MicrophoneBackend;
use crate::error::CaptureError;

/// Where noise is captured from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// Default system input device
    Microphone,
    /// WAV file replayed in real time (demos, reproducible runs)
    File(PathBuf),
}

/// Audio capture device provider
///
/// Implementations:
/// - `MicrophoneBackend`: live input through cpal
/// - `FileBackend`: looped WAV replay
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Open a capture stream wired to a frequency analysis graph
    ///
    /// Must not leave anything held when it fails.
    async fn open_stream(&self) -> Result<Box<dyn CaptureStream>, CaptureError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// An open capture stream plus its frequency analysis graph
pub trait CaptureStream: Send {
    /// Number of frequency bins produced per snapshot (fixed for the stream)
    fn bin_count(&self) -> usize;

    /// Fill `bins` with the latest frequency-domain energies, 0-255 per bin
    ///
    /// `bins` must be `bin_count()` long.
    fn read_frequency_energies(&mut self, bins: &mut [u8]);

    /// Release the device. Safe to call more than once.
    fn close(&mut self);
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create a capture backend for the configured source
    pub fn create(source: CaptureSource, analyser: AnalyserConfig) -> Box<dyn CaptureBackend> {
        match source {
            CaptureSource::Microphone => {
                info!("Using microphone capture backend");
                Box::new(MicrophoneBackend::new(analyser))
            }
            CaptureSource::File(path) => {
                info!("Using file replay backend: {}", path.display());
                Box::new(FileBackend::new(path, analyser))
            }
        }
    }
}
