// Live microphone capture through cpal
//
// cpal streams are not Send, so each open stream lives on its own
// "mic-capture" thread. The data callback mixes frames down to mono and
// pushes them into a shared rolling window; the analysis side reads that
// window on demand.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use tracing::{info, warn};

use super::analyser::{AnalyserConfig, FrequencyAnalyser, SampleWindow};
use super::backend::{CaptureBackend, CaptureStream};
use crate::error::CaptureError;

/// Input device description for `quiet-read devices`
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Enumerate capture devices on the default host
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut infos = Vec::new();
    for device in host.input_devices()? {
        let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());
        let config = device.default_input_config().ok();

        infos.push(InputDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            sample_rate: config.as_ref().map(|c| c.sample_rate().0),
            channels: config.as_ref().map(|c| c.channels()),
            name,
        });
    }

    Ok(infos)
}

/// Microphone backend using the host's default input device
pub struct MicrophoneBackend {
    analyser: AnalyserConfig,
}

impl MicrophoneBackend {
    pub fn new(analyser: AnalyserConfig) -> Self {
        Self { analyser }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn open_stream(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        self.analyser.validate()?;

        let config = self.analyser.clone();
        let stream = tokio::task::spawn_blocking(move || MicrophoneStream::open(config))
            .await
            .map_err(|e| CaptureError::Backend(format!("capture worker failed: {}", e)))??;

        Ok(Box::new(stream))
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

/// An open microphone stream and its analyser
pub struct MicrophoneStream {
    window: Arc<Mutex<SampleWindow>>,
    analyser: FrequencyAnalyser,
    scratch: Vec<f32>,
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
    device_name: String,
}

impl MicrophoneStream {
    fn open(config: AnalyserConfig) -> Result<Self, CaptureError> {
        let window = Arc::new(Mutex::new(SampleWindow::new(config.fft_size)));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<String, CaptureError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let worker_window = Arc::clone(&window);
        let worker = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let stream = match build_default_input(worker_window) {
                    Ok((stream, name)) => {
                        let _ = ready_tx.send(Ok(name));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Park until close() signals or the sender is dropped
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| CaptureError::Backend(format!("failed to spawn capture thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(device_name)) => {
                info!("Microphone capture opened: {}", device_name);
                Ok(Self {
                    window,
                    analyser: FrequencyAnalyser::new(config.clone()),
                    scratch: Vec::with_capacity(config.fft_size),
                    stop_tx: Some(stop_tx),
                    worker: Some(worker),
                    device_name,
                })
            }
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(CaptureError::Backend(
                    "capture thread exited before reporting readiness".to_string(),
                ))
            }
        }
    }
}

impl CaptureStream for MicrophoneStream {
    fn bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    fn read_frequency_energies(&mut self, bins: &mut [u8]) {
        if let Ok(window) = self.window.lock() {
            window.copy_into(&mut self.scratch);
        }
        self.analyser.byte_frequency_data(&self.scratch, bins);
    }

    fn close(&mut self) {
        let Some(stop_tx) = self.stop_tx.take() else {
            return;
        };
        let _ = stop_tx.send(());

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Microphone capture thread panicked during shutdown");
            }
        }

        info!("Microphone capture closed: {}", self.device_name);
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_default_input(
    window: Arc<Mutex<SampleWindow>>,
) -> Result<(cpal::Stream, String), CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
    let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());

    let supported = device
        .default_input_config()
        .map_err(map_default_config_error)?;
    let channels = supported.channels() as usize;
    let config: StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, window),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, window),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, window),
        SampleFormat::I32 => build_stream::<i32>(&device, &config, channels, window),
        other => {
            return Err(CaptureError::Unsupported(format!(
                "sample format {:?}",
                other
            )))
        }
    }?;

    stream.play().map_err(map_play_error)?;

    Ok((stream, name))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    channels: usize,
    window: Arc<Mutex<SampleWindow>>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let channels = channels.max(1);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if let Ok(mut window) = window.lock() {
                    for frame in data.chunks(channels) {
                        let sum: f32 = frame
                            .iter()
                            .map(|&s| -> f32 { cpal::Sample::from_sample(s) })
                            .sum();
                        window.push(sum / frame.len() as f32);
                    }
                }
            },
            move |err| {
                warn!("Audio input stream error: {}", err);
            },
            None,
        )
        .map_err(map_build_error)
}

fn map_default_config_error(err: cpal::DefaultStreamConfigError) -> CaptureError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::NoDevice,
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
            CaptureError::Unsupported("device does not support input".to_string())
        }
        cpal::DefaultStreamConfigError::BackendSpecific { err } => classify_backend(err.description),
        #[allow(unreachable_patterns)]
        other => CaptureError::Backend(other.to_string()),
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::NoDevice,
        cpal::BuildStreamError::BackendSpecific { err } => classify_backend(err.description),
        other => CaptureError::Unsupported(other.to_string()),
    }
}

fn map_play_error(err: cpal::PlayStreamError) -> CaptureError {
    match err {
        cpal::PlayStreamError::DeviceNotAvailable => CaptureError::NoDevice,
        cpal::PlayStreamError::BackendSpecific { err } => classify_backend(err.description),
        #[allow(unreachable_patterns)]
        other => CaptureError::Backend(other.to_string()),
    }
}

/// Backends report permission and contention problems only as text
fn classify_backend(description: String) -> CaptureError {
    let lowered = description.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("not authorized") {
        CaptureError::PermissionDenied
    } else if lowered.contains("busy") || lowered.contains("in use") {
        CaptureError::DeviceBusy
    } else {
        CaptureError::Backend(description)
    }
}
