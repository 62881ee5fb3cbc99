//! HTTP API server for controlling the reading session
//!
//! - GET /session - Current session snapshot
//! - POST /session/start - Start a session
//! - POST /session/back - Return to setup
//! - POST /session/toggle - Pause or resume
//! - PUT /session/sensitivity - Change the warning threshold
//! - GET /session/history - Per-second noise readings as JSON
//! - GET /session/history.csv - The same readings as a CSV download
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
