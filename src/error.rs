use thiserror::Error;

/// Failure to acquire the audio capture resource.
///
/// Raised only while opening a capture stream. Every variant is terminal for
/// the session attempt: nothing retries it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no audio capture device available")]
    NoDevice,

    #[error("audio capture device is busy")]
    DeviceBusy,

    #[error("unsupported capture configuration: {0}")]
    Unsupported(String),

    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the session controller to the presentation layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Rejected before leaving `Setup`; the state does not change.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("session controller has shut down")]
    ControllerClosed,
}
