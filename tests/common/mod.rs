// Shared test doubles: a scripted capture backend and a recording alert player
#![allow(dead_code)]

use anyhow::Result;
use quiet_read::audio::{AlertPlayer, CaptureBackend, CaptureStream};
use quiet_read::error::CaptureError;
use quiet_read::session::{ControllerOptions, SessionController, SessionHandle};
use quiet_read::noise::SamplerConfig;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Bin value that scales to level 39
pub const QUIET_BIN: u8 = 50;
pub const QUIET_LEVEL: u8 = 39;

/// Bin value that scales to level 75
pub const LOUD_BIN: u8 = 96;
pub const LOUD_LEVEL: u8 = 75;

/// Capture backend whose every bin holds one adjustable value
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    bin_value: Arc<AtomicU8>,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<CaptureError>>>,
}

impl ScriptedBackend {
    pub fn new(bin_value: u8) -> Self {
        let backend = Self::default();
        backend.set_bin_value(bin_value);
        backend
    }

    pub fn set_bin_value(&self, value: u8) {
        self.bin_value.store(value, Ordering::SeqCst);
    }

    /// Make the next opens fail with `error`, or succeed again with `None`
    pub fn fail_with(&self, error: Option<CaptureError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn open_stream(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }

        Ok(Box::new(ScriptedStream {
            bin_value: Arc::clone(&self.bin_value),
            closes: Arc::clone(&self.closes),
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedStream {
    bin_value: Arc<AtomicU8>,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

impl CaptureStream for ScriptedStream {
    fn bin_count(&self) -> usize {
        256
    }

    fn read_frequency_energies(&mut self, bins: &mut [u8]) {
        let value = self.bin_value.load(Ordering::SeqCst);
        bins.iter_mut().for_each(|b| *b = value);
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Alert player that counts calls and tracks whether it is sounding
#[derive(Default)]
pub struct RecordingAlertPlayer {
    plays: AtomicUsize,
    stops: AtomicUsize,
    sounding: Mutex<bool>,
}

impl RecordingAlertPlayer {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_sounding(&self) -> bool {
        *self.sounding.lock().unwrap()
    }
}

impl AlertPlayer for RecordingAlertPlayer {
    fn play(&self) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        *self.sounding.lock().unwrap() = true;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.sounding.lock().unwrap() = false;
        Ok(())
    }
}

pub fn options(default_sensitivity: u8) -> ControllerOptions {
    ControllerOptions {
        default_sensitivity,
        tick_period: Duration::from_secs(1),
        sampler: SamplerConfig {
            sample_interval: Duration::from_millis(16),
        },
    }
}

/// Spawn a controller wired to the given doubles
pub fn spawn_session(
    backend: &ScriptedBackend,
    alert: &Arc<RecordingAlertPlayer>,
) -> (SessionHandle, JoinHandle<()>) {
    SessionController::spawn(
        Arc::new(backend.clone()),
        Arc::clone(alert) as Arc<dyn AlertPlayer>,
        options(100),
    )
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
