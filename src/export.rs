//! Noise history export
//!
//! Renders the per-tick history as a spreadsheet-friendly CSV file.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::noise::NoiseRecord;

/// Shown instead of a download when nothing has been recorded
pub const EMPTY_HISTORY_NOTICE: &str = "No noise data has been recorded yet.";

pub const CSV_HEADER: &str = "Timestamp,Noise Level";

const UTF8_BOM: &str = "\u{feff}";

/// Result of an export request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    /// Nothing was written; show `EMPTY_HISTORY_NOTICE` to the user
    Empty,
}

impl ExportOutcome {
    pub fn notice(&self) -> String {
        match self {
            ExportOutcome::Written { path, rows } => {
                format!("Saved {} readings to {}", rows, path.display())
            }
            ExportOutcome::Empty => EMPTY_HISTORY_NOTICE.to_string(),
        }
    }
}

/// CSV renderer for noise history
#[derive(Debug, Clone)]
pub struct CsvExporter {
    /// chrono strftime pattern, applied in local time
    pub timestamp_format: String,
    /// Prefix a UTF-8 byte order mark so spreadsheets detect the encoding
    pub include_bom: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
            include_bom: true,
        }
    }
}

impl CsvExporter {
    pub fn new(timestamp_format: impl Into<String>, include_bom: bool) -> Self {
        Self {
            timestamp_format: timestamp_format.into(),
            include_bom,
        }
    }

    /// Header plus one row per record, in order
    pub fn render(&self, records: &[NoiseRecord]) -> String {
        let mut out = String::new();
        if self.include_bom {
            out.push_str(UTF8_BOM);
        }
        out.push_str(CSV_HEADER);
        out.push('\n');

        for record in records {
            let timestamp = record
                .timestamp
                .with_timezone(&Local)
                .format(&self.timestamp_format)
                .to_string();
            // Writing into a String cannot fail
            let _ = writeln!(out, "{},{}", escape_field(&timestamp), record.level);
        }

        out
    }

    /// Write `records` to `path`; an empty history writes nothing
    pub fn export_to_file(&self, records: &[NoiseRecord], path: &Path) -> Result<ExportOutcome> {
        if records.is_empty() {
            info!("Export skipped: no noise history");
            return Ok(ExportOutcome::Empty);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(path, self.render(records))
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Exported {} noise readings to {}", records.len(), path.display());

        Ok(ExportOutcome::Written {
            path: path.to_path_buf(),
            rows: records.len(),
        })
    }
}

/// Quote a field containing a comma, quote or newline
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
