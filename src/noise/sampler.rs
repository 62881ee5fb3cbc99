use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::level::{scale_energies, NoiseLevel};
use crate::audio::{CaptureBackend, CaptureStream};
use crate::error::CaptureError;

/// Sampling loop configuration
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Delay between readings; one display frame by default
    pub sample_interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(16), // ~60 Hz
        }
    }
}

/// A fresh reading, tagged with the capture run that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUpdate {
    pub generation: u64,
    pub level: NoiseLevel,
}

/// Owns the capture stream and publishes noise readings
///
/// The latest reading is a single-writer slot read with `current_level()`.
/// Every reading is also pushed to the update channel handed out by `new`,
/// so a consumer can react to each one rather than polling.
pub struct NoiseSampler {
    backend: Arc<dyn CaptureBackend>,
    config: SamplerConfig,
    level: Arc<AtomicU8>,
    updates: mpsc::UnboundedSender<LevelUpdate>,
    active: Option<ActiveSampling>,
    next_generation: u64,
}

struct ActiveSampling {
    generation: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Closes the capture stream whichever way the sampling loop exits
struct CaptureGuard {
    stream: Box<dyn CaptureStream>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.stream.close();
    }
}

impl NoiseSampler {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        config: SamplerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<LevelUpdate>) {
        let (updates, updates_rx) = mpsc::unbounded_channel();

        let sampler = Self {
            backend,
            config,
            level: Arc::new(AtomicU8::new(0)),
            updates,
            active: None,
            next_generation: 0,
        };

        (sampler, updates_rx)
    }

    /// Open the capture stream and begin sampling
    ///
    /// A no-op while already running. On failure nothing stays open and the
    /// reading is reset to 0.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            debug!("Noise sampler already running");
            return Ok(());
        }

        info!("Starting noise sampler ({})", self.backend.name());

        let stream = match self.backend.open_stream().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to open capture stream: {}", e);
                self.stop().await;
                return Err(e);
            }
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(sampling_loop(
            CaptureGuard { stream },
            self.config.sample_interval,
            Arc::clone(&self.level),
            self.updates.clone(),
            cancel.clone(),
            generation,
        ));

        self.active = Some(ActiveSampling {
            generation,
            cancel,
            handle,
        });

        info!("Noise sampler started (run {})", generation);

        Ok(())
    }

    /// Cancel sampling, release the device and reset the reading to 0
    ///
    /// Safe to call repeatedly or before any start.
    pub async fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            if let Err(e) = active.handle.await {
                error!("Sampling loop panicked: {}", e);
            }
            info!("Noise sampler stopped (run {})", active.generation);
        }

        self.level.store(0, Ordering::SeqCst);
    }

    /// Most recent reading; 0 while inactive
    pub fn current_level(&self) -> NoiseLevel {
        self.level.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Generation of the running capture; updates from any other are stale
    pub fn active_generation(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.generation)
    }
}

impl Drop for NoiseSampler {
    fn drop(&mut self) {
        // The loop drops its guard, closing the stream, once it sees this
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

async fn sampling_loop(
    mut capture: CaptureGuard,
    interval: Duration,
    level: Arc<AtomicU8>,
    updates: mpsc::UnboundedSender<LevelUpdate>,
    cancel: CancellationToken,
    generation: u64,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut bins = vec![0u8; capture.stream.bin_count()];

    debug!(
        "Sampling loop {} running ({} bins every {:?})",
        generation,
        bins.len(),
        interval
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                capture.stream.read_frequency_energies(&mut bins);
                let reading = scale_energies(&bins);

                // A stop that landed mid-computation wins over this result
                if cancel.is_cancelled() {
                    break;
                }

                level.store(reading, Ordering::SeqCst);
                if updates.send(LevelUpdate { generation, level: reading }).is_err() {
                    debug!("Level receiver dropped, ending sampling loop {}", generation);
                    break;
                }
            }
        }
    }

    debug!("Sampling loop {} exiting", generation);
}
