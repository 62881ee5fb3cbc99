use crate::export::CsvExporter;
use crate::session::SessionHandle;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the single reading session
    pub session: SessionHandle,

    /// Renders `/session/history.csv`
    pub exporter: CsvExporter,

    /// Filename suggested to the browser for downloads
    pub export_filename: String,

    /// Used when a start request names no duration
    pub default_minutes: u32,
}

impl AppState {
    pub fn new(session: SessionHandle, exporter: CsvExporter) -> Self {
        Self {
            session,
            exporter,
            export_filename: "noise-log.csv".to_string(),
            default_minutes: 10,
        }
    }

    pub fn with_export_filename(mut self, filename: impl Into<String>) -> Self {
        self.export_filename = filename.into();
        self
    }

    pub fn with_default_minutes(mut self, minutes: u32) -> Self {
        self.default_minutes = minutes;
        self
    }
}
