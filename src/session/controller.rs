// Session controller
//
// A single task owns the state machine together with every resource its
// effects touch: the noise sampler, the countdown clock and the warning.
// Commands, sampler readings and clock ticks are all serialized through its
// select loop, so each transition runs start to finish before the next
// event is looked at.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::clock::{ClockTick, CountdownClock};
use super::config::{check_sensitivity, SessionConfig};
use super::machine::{Effect, SessionEvent, SessionMachine, SessionPhase};
use super::stats::SessionSnapshot;
use super::warning::WarningCoordinator;
use crate::audio::{AlertPlayer, CaptureBackend};
use crate::error::SessionError;
use crate::export::{CsvExporter, ExportOutcome};
use crate::noise::{LevelUpdate, NoiseRecord, NoiseSampler, SamplerConfig};

/// Knobs for a controller instance
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Sensitivity shown on the setup screen before any start
    pub default_sensitivity: u8,
    /// Countdown granularity; one second outside of tests
    pub tick_period: Duration,
    pub sampler: SamplerConfig,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            default_sensitivity: 100,
            tick_period: Duration::from_secs(1),
            sampler: SamplerConfig::default(),
        }
    }
}

enum Command {
    Start {
        config: SessionConfig,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    GoBack {
        reply: oneshot::Sender<()>,
    },
    TogglePlayPause {
        reply: oneshot::Sender<SessionPhase>,
    },
    SetSensitivity {
        value: u8,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub struct SessionController {
    machine: SessionMachine,
    sampler: NoiseSampler,
    levels: mpsc::UnboundedReceiver<LevelUpdate>,
    clock: CountdownClock,
    ticks: mpsc::UnboundedReceiver<ClockTick>,
    warning: WarningCoordinator,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    capture_error: Option<String>,
}

impl SessionController {
    /// Spawn the controller task and return a handle to drive it
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        backend: Arc<dyn CaptureBackend>,
        alert: Arc<dyn AlertPlayer>,
        options: ControllerOptions,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (sampler, levels) = NoiseSampler::new(backend, options.sampler.clone());
        let (clock, ticks) = CountdownClock::new(options.tick_period);
        let (commands_tx, commands) = mpsc::unbounded_channel();

        let machine = SessionMachine::new(options.default_sensitivity);
        let initial = SessionSnapshot {
            sensitivity: machine.sensitivity(),
            ..SessionSnapshot::default()
        };
        let (snapshots, snapshots_rx) = watch::channel(initial);

        let controller = Self {
            machine,
            sampler,
            levels,
            clock,
            ticks,
            warning: WarningCoordinator::new(alert),
            commands,
            snapshots,
            session_id: None,
            started_at: None,
            capture_error: None,
        };

        let handle = tokio::spawn(controller.run());

        (
            SessionHandle {
                commands: commands_tx,
                snapshots: snapshots_rx,
            },
            handle,
        )
    }

    async fn run(mut self) {
        info!("Session controller started");

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        debug!("All session handles dropped");
                        self.release().await;
                        break;
                    }
                },
                Some(update) = self.levels.recv() => self.handle_level(update).await,
                Some(tick) = self.ticks.recv() => self.handle_tick(tick).await,
            }
        }

        info!("Session controller stopped");
    }

    /// Returns false once the controller should stop
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Start { config, reply } => {
                let _ = reply.send(self.start(config).await);
            }
            Command::GoBack { reply } => {
                if let Err(e) = self.dispatch(SessionEvent::GoBack).await {
                    error!("Go-back failed: {}", e);
                }
                self.session_id = None;
                self.started_at = None;
                self.publish();
                let _ = reply.send(());
            }
            Command::TogglePlayPause { reply } => {
                if let Err(e) = self.dispatch(SessionEvent::TogglePause).await {
                    error!("Toggle failed: {}", e);
                }
                let _ = reply.send(self.machine.phase());
            }
            Command::SetSensitivity { value, reply } => {
                let result = self.dispatch(SessionEvent::SetSensitivity(value)).await;
                if result.is_ok() {
                    info!("Sensitivity set to {}", value);
                }
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown { reply } => {
                self.release().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn start(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        if self.machine.phase() != SessionPhase::Setup {
            debug!(
                "Ignoring start while {} (session already configured)",
                self.machine.phase()
            );
            return Ok(());
        }

        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.started_at = Some(Utc::now());
        self.capture_error = None;

        info!(
            "Starting session {}: {}s at sensitivity {}",
            session_id,
            config.duration_secs(),
            config.sensitivity()
        );

        let result = self.dispatch(SessionEvent::Start(config)).await;
        if result.is_err() {
            self.session_id = None;
            self.started_at = None;
            self.publish();
        }
        result
    }

    async fn handle_level(&mut self, update: LevelUpdate) {
        if self.sampler.active_generation() != Some(update.generation) {
            return;
        }
        if let Err(e) = self.dispatch(SessionEvent::Reading(update.level)).await {
            error!("Failed to apply noise reading: {}", e);
        }
    }

    async fn handle_tick(&mut self, tick: ClockTick) {
        if self.clock.current_epoch() != Some(tick.epoch) {
            debug!("Dropping stale tick from epoch {}", tick.epoch);
            return;
        }

        let event = SessionEvent::Tick {
            level: self.sampler.current_level(),
            at: Utc::now(),
        };
        if let Err(e) = self.dispatch(event).await {
            error!("Failed to apply tick: {}", e);
        }

        if self.machine.phase() == SessionPhase::Completed {
            info!(
                "Session {} completed with {} readings",
                self.session_label(),
                self.machine.history().len()
            );
        }
    }

    /// Apply one event and carry out its effects
    ///
    /// If the sampler cannot be started the session falls back to setup and
    /// the capture error is kept for the next snapshot.
    async fn dispatch(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let quiet = matches!(event, SessionEvent::Reading(_));
        let previous = self.machine.phase();
        let effects = self.machine.apply(event)?;
        self.log_transition(previous);

        let changed = !quiet || !effects.is_empty();
        let mut outcome = Ok(());

        for effect in effects {
            if let Err(e) = self.execute(effect).await {
                outcome = Err(e);
                break;
            }
        }

        if let Err(SessionError::Capture(ref e)) = outcome {
            error!("Could not acquire microphone: {}", e);
            self.capture_error = Some(e.to_string());

            let previous = self.machine.phase();
            for effect in self.machine.apply(SessionEvent::GoBack)? {
                let _ = self.execute(effect).await;
            }
            self.log_transition(previous);
        }

        if changed {
            self.publish();
        }
        outcome
    }

    async fn execute(&mut self, effect: Effect) -> Result<(), SessionError> {
        match effect {
            Effect::StartSampler => self.sampler.start().await?,
            Effect::StopSampler => self.sampler.stop().await,
            Effect::StartClock => self.clock.start(),
            Effect::StopClock => self.clock.stop(),
            Effect::ActivateWarning => self.warning.activate(),
            Effect::DeactivateWarning => self.warning.deactivate(),
        }
        Ok(())
    }

    /// Drop back to setup, releasing the microphone, clock and alert
    async fn release(&mut self) {
        if let Err(e) = self.dispatch(SessionEvent::GoBack).await {
            warn!("Failed to release session resources: {}", e);
        }
    }

    fn log_transition(&self, previous: SessionPhase) {
        let current = self.machine.phase();
        if previous != current {
            info!(
                "Session {}: {} -> {} ({}s remaining)",
                self.session_label(),
                previous,
                current,
                self.machine.remaining_secs()
            );
        }
    }

    fn session_label(&self) -> String {
        self.session_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            phase: self.machine.phase(),
            remaining_secs: self.machine.remaining_secs(),
            duration_secs: self.machine.duration_secs(),
            sensitivity: self.machine.sensitivity(),
            displayed_level: self.machine.displayed_level(),
            warning_active: self.warning.is_active(),
            started_at: self.started_at,
            capture_error: self.capture_error.clone(),
            history: self.machine.history().records().to_vec(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

/// Cloneable front door to a running session controller
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Start a session of `duration_secs` seconds
    pub async fn start(&self, duration_secs: i64, sensitivity: i64) -> Result<(), SessionError> {
        let config = SessionConfig::new(duration_secs, sensitivity)?;
        self.start_with(config).await
    }

    /// Start a session given in whole minutes
    pub async fn start_minutes(&self, minutes: i64, sensitivity: i64) -> Result<(), SessionError> {
        let config = SessionConfig::from_minutes(minutes, sensitivity)?;
        self.start_with(config).await
    }

    pub async fn start_with(&self, config: SessionConfig) -> Result<(), SessionError> {
        self.request(|reply| Command::Start { config, reply })
            .await?
    }

    /// Abandon the session and return to setup; sensitivity is kept
    pub async fn go_back(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::GoBack { reply }).await
    }

    /// Pause or resume; returns the phase afterwards
    pub async fn toggle_play_pause(&self) -> Result<SessionPhase, SessionError> {
        self.request(|reply| Command::TogglePlayPause { reply })
            .await
    }

    /// Change the warning threshold; takes effect on the next reading
    pub async fn set_sensitivity(&self, value: i64) -> Result<(), SessionError> {
        let value = check_sensitivity(value)?;
        self.request(|reply| Command::SetSensitivity { value, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn history(&self) -> Result<Vec<NoiseRecord>, SessionError> {
        Ok(self.snapshot().await?.history)
    }

    /// Write the history as CSV to `path`
    pub async fn download(&self, exporter: &CsvExporter, path: &Path) -> Result<ExportOutcome> {
        let history = self.history().await?;
        exporter.export_to_file(&history, path)
    }

    /// Receiver that observes every published state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Release all resources and stop the controller task
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| SessionError::ControllerClosed)?;
        response.await.map_err(|_| SessionError::ControllerClosed)
    }
}
