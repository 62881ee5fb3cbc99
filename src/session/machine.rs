use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::{check_sensitivity, SessionConfig, MAX_SENSITIVITY, MIN_SENSITIVITY};
use crate::error::SessionError;
use crate::noise::{NoiseHistoryLog, NoiseLevel, NoiseRecord};

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Setup,
    Running,
    PausedByWarning,
    PausedByUser,
    Completed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Setup => "setup",
            SessionPhase::Running => "running",
            SessionPhase::PausedByWarning => "paused-by-warning",
            SessionPhase::PausedByUser => "paused-by-user",
            SessionPhase::Completed => "completed",
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, SessionPhase::PausedByWarning | SessionPhase::PausedByUser)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// "start session" from the setup screen
    Start(SessionConfig),
    /// One countdown second elapsed; `level` is the reading snapshotted for it
    Tick {
        level: NoiseLevel,
        at: DateTime<Utc>,
    },
    /// A fresh sampler reading, delivered for every update
    Reading(NoiseLevel),
    TogglePause,
    GoBack,
    SetSensitivity(u8),
}

/// Side effects the owner of the machine must carry out, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    StartSampler,
    StopSampler,
    StartClock,
    StopClock,
    ActivateWarning,
    DeactivateWarning,
}

/// The session state machine
///
/// `apply` is the only way state changes. It is total over (phase, event):
/// combinations with no defined transition return no effects. Errors are
/// reserved for invalid configuration values, which leave state untouched.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    phase: SessionPhase,
    duration_secs: u32,
    remaining_secs: u32,
    sensitivity: u8,
    displayed_level: NoiseLevel,
    history: NoiseHistoryLog,
}

impl SessionMachine {
    pub fn new(default_sensitivity: u8) -> Self {
        Self {
            phase: SessionPhase::Setup,
            duration_secs: 0,
            remaining_secs: 0,
            sensitivity: default_sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY),
            displayed_level: 0,
            history: NoiseHistoryLog::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn sensitivity(&self) -> u8 {
        self.sensitivity
    }

    /// Level shown to the user; updated once per tick, 0 outside a session
    pub fn displayed_level(&self) -> NoiseLevel {
        self.displayed_level
    }

    pub fn history(&self) -> &NoiseHistoryLog {
        &self.history
    }

    pub fn apply(&mut self, event: SessionEvent) -> Result<Vec<Effect>, SessionError> {
        use SessionPhase::*;

        let effects = match (self.phase, event) {
            (Setup, SessionEvent::Start(config)) => {
                let config =
                    SessionConfig::new(config.duration_secs() as i64, config.sensitivity() as i64)?;

                self.duration_secs = config.duration_secs();
                self.remaining_secs = config.duration_secs();
                self.sensitivity = config.sensitivity();
                self.displayed_level = 0;
                self.history.clear();
                self.phase = Running;

                vec![Effect::StartSampler, Effect::StartClock]
            }

            (Running, SessionEvent::Tick { level, at }) => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                self.history.append(NoiseRecord {
                    timestamp: at,
                    level,
                });
                self.displayed_level = level;

                if self.remaining_secs == 0 {
                    self.phase = Completed;
                    self.displayed_level = 0;
                    vec![
                        Effect::StopClock,
                        Effect::StopSampler,
                        Effect::DeactivateWarning,
                    ]
                } else {
                    Vec::new()
                }
            }

            (Running, SessionEvent::Reading(level))
                if self.remaining_secs > 0 && level > self.sensitivity =>
            {
                self.phase = PausedByWarning;
                vec![Effect::StopClock, Effect::ActivateWarning]
            }

            (Running, SessionEvent::TogglePause) if self.remaining_secs > 0 => {
                self.phase = PausedByUser;
                vec![Effect::StopClock]
            }

            (PausedByWarning, SessionEvent::TogglePause) if self.remaining_secs > 0 => {
                self.phase = Running;
                vec![Effect::DeactivateWarning, Effect::StartClock]
            }

            (PausedByUser, SessionEvent::TogglePause) if self.remaining_secs > 0 => {
                self.phase = Running;
                vec![Effect::StartClock]
            }

            (_, SessionEvent::GoBack) => {
                self.phase = Setup;
                self.duration_secs = 0;
                self.remaining_secs = 0;
                self.displayed_level = 0;
                vec![
                    Effect::StopClock,
                    Effect::StopSampler,
                    Effect::DeactivateWarning,
                ]
            }

            (_, SessionEvent::SetSensitivity(value)) => {
                self.sensitivity = check_sensitivity(value as i64)?;
                Vec::new()
            }

            _ => Vec::new(),
        };

        Ok(effects)
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new(MAX_SENSITIVITY)
    }
}
