use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session state
        .route("/session", get(handlers::get_session))
        // Session commands
        .route("/session/start", post(handlers::start_session))
        .route("/session/back", post(handlers::go_back))
        .route("/session/toggle", post(handlers::toggle_play_pause))
        .route("/session/sensitivity", put(handlers::set_sensitivity))
        // History
        .route("/session/history", get(handlers::get_history))
        .route("/session/history.csv", get(handlers::download_history))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
