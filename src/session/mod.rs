//! Reading session management
//!
//! - `machine`: the session state machine, one transition function over
//!   (phase, event) returning the effects to perform
//! - `controller`: the task that owns the machine and performs its effects
//! - `clock`: one-second countdown ticks
//! - `warning`: the warning indicator and alert sound
//! - `stats`: snapshots handed to presentation layers

mod clock;
mod config;
mod controller;
mod machine;
mod stats;
mod warning;

pub use clock::{ClockTick, CountdownClock};
pub use config::{check_sensitivity, SessionConfig, MAX_SENSITIVITY, MIN_SENSITIVITY};
pub use controller::{ControllerOptions, SessionController, SessionHandle};
pub use machine::{Effect, SessionEvent, SessionMachine, SessionPhase};
pub use stats::SessionSnapshot;
pub use warning::WarningCoordinator;
