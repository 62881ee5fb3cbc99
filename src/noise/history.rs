use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::level::NoiseLevel;

/// One per-tick noise sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseRecord {
    /// When the tick fired
    pub timestamp: DateTime<Utc>,

    /// Reading sampled at that tick (not an average over the second)
    pub level: NoiseLevel,
}

/// Append-only, insertion-ordered noise history for the current session
///
/// Only the session state machine appends or clears; everyone else gets the
/// read-only view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoiseHistoryLog {
    records: Vec<NoiseRecord>,
}

impl NoiseHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, record: NoiseRecord) {
        self.records.push(record);
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[NoiseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoiseRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&NoiseRecord> {
        self.records.last()
    }
}
