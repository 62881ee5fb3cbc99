pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod noise;
pub mod session;

pub use audio::{
    AlertPlayer, AnalyserConfig, CaptureBackend, CaptureBackendFactory, CaptureSource,
    CaptureStream, RodioAlertPlayer, SilentAlertPlayer,
};
pub use config::Config;
pub use error::{CaptureError, SessionError};
pub use export::{CsvExporter, ExportOutcome, EMPTY_HISTORY_NOTICE};
pub use http::{create_router, AppState};
pub use noise::{NoiseHistoryLog, NoiseLevel, NoiseRecord, NoiseSampler, SamplerConfig};
pub use session::{
    ControllerOptions, SessionConfig, SessionController, SessionHandle, SessionPhase,
    SessionSnapshot,
};
