pub mod alert;
pub mod analyser;
pub mod backend;
pub mod file;
pub mod microphone;

pub use alert::{AlertChime, AlertPlayer, RodioAlertPlayer, SilentAlertPlayer};
pub use analyser::{AnalyserConfig, FrequencyAnalyser, SampleWindow};
pub use backend::{CaptureBackend, CaptureBackendFactory, CaptureSource, CaptureStream};
pub use file::{AudioFile, FileBackend};
pub use microphone::{list_input_devices, InputDeviceInfo, MicrophoneBackend};
