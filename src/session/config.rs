use serde::{Deserialize, Serialize};

use crate::error::SessionError;

pub const MIN_SENSITIVITY: u8 = 1;
pub const MAX_SENSITIVITY: u8 = 100;

/// Validated configuration for one reading session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    duration_secs: u32,
    sensitivity: u8,
}

impl SessionConfig {
    /// Duration must be positive; sensitivity must lie in [1, 100]
    pub fn new(duration_secs: i64, sensitivity: i64) -> Result<Self, SessionError> {
        if duration_secs <= 0 {
            return Err(SessionError::InvalidConfiguration(format!(
                "duration must be positive, got {}s",
                duration_secs
            )));
        }

        let duration_secs = u32::try_from(duration_secs).map_err(|_| {
            SessionError::InvalidConfiguration(format!("duration {}s is too long", duration_secs))
        })?;

        Ok(Self {
            duration_secs,
            sensitivity: check_sensitivity(sensitivity)?,
        })
    }

    pub fn from_minutes(minutes: i64, sensitivity: i64) -> Result<Self, SessionError> {
        let seconds = minutes.checked_mul(60).ok_or_else(|| {
            SessionError::InvalidConfiguration(format!("{} minutes is too long", minutes))
        })?;
        Self::new(seconds, sensitivity)
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn sensitivity(&self) -> u8 {
        self.sensitivity
    }
}

/// Accept a sensitivity within [1, 100]
pub fn check_sensitivity(value: i64) -> Result<u8, SessionError> {
    if (MIN_SENSITIVITY as i64..=MAX_SENSITIVITY as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(SessionError::InvalidConfiguration(format!(
            "sensitivity must be between {} and {}, got {}",
            MIN_SENSITIVITY, MAX_SENSITIVITY, value
        )))
    }
}
