use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::machine::SessionPhase;
use crate::noise::{NoiseLevel, NoiseRecord};

/// Everything a presentation layer needs to render the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Set while a session is configured; cleared on go-back
    pub session_id: Option<Uuid>,

    pub phase: SessionPhase,

    pub remaining_secs: u32,

    pub duration_secs: u32,

    pub sensitivity: u8,

    /// Per-tick reading, not the live sampler value
    pub displayed_level: NoiseLevel,

    pub warning_active: bool,

    /// When the current session left setup
    pub started_at: Option<DateTime<Utc>>,

    /// Why the last start attempt failed to acquire the microphone
    pub capture_error: Option<String>,

    pub history: Vec<NoiseRecord>,
}

impl SessionSnapshot {
    /// Share of the session still to go, 0-100
    pub fn progress_percent(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        self.remaining_secs as f64 / self.duration_secs as f64 * 100.0
    }

    /// Remaining time as `mm:ss`
    pub fn remaining_clock(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_secs / 60,
            self.remaining_secs % 60
        )
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            session_id: None,
            phase: SessionPhase::Setup,
            remaining_secs: 0,
            duration_secs: 0,
            sensitivity: 100,
            displayed_level: 0,
            warning_active: false,
            started_at: None,
            capture_error: None,
            history: Vec::new(),
        }
    }
}
