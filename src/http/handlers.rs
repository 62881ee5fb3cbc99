use super::state::AppState;
use crate::error::SessionError;
use crate::export::EMPTY_HISTORY_NOTICE;
use crate::session::{SessionPhase, SessionSnapshot};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    /// Whole minutes, as entered on the setup screen
    pub minutes: Option<i64>,

    /// Exact duration; takes precedence over `minutes`
    pub duration_seconds: Option<i64>,

    /// Defaults to the current sensitivity
    pub sensitivity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SensitivityRequest {
    pub sensitivity: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn session_error(e: SessionError) -> Response {
    let status = match &e {
        SessionError::InvalidConfiguration(_) => StatusCode::BAD_REQUEST,
        SessionError::Capture(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::ControllerClosed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e.to_string())
}

async fn snapshot_response(state: &AppState) -> Response {
    match state.session.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => session_error(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> Response {
    snapshot_response(&state).await
}

/// POST /session/start
/// Leave setup and begin the countdown
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Response {
    let current: SessionSnapshot = match state.session.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => return session_error(e),
    };

    if current.phase != SessionPhase::Setup {
        return error_response(
            StatusCode::CONFLICT,
            format!("A session is already {}; go back first", current.phase),
        );
    }

    let sensitivity = req.sensitivity.unwrap_or(current.sensitivity as i64);
    let result = match (req.duration_seconds, req.minutes) {
        (Some(seconds), _) => state.session.start(seconds, sensitivity).await,
        (None, Some(minutes)) => state.session.start_minutes(minutes, sensitivity).await,
        (None, None) => {
            state
                .session
                .start_minutes(state.default_minutes as i64, sensitivity)
                .await
        }
    };

    match result {
        Ok(()) => {
            info!("Session started over HTTP");
            snapshot_response(&state).await
        }
        Err(e) => {
            warn!("Session start rejected: {}", e);
            session_error(e)
        }
    }
}

/// POST /session/back
pub async fn go_back(State(state): State<AppState>) -> Response {
    if let Err(e) = state.session.go_back().await {
        return session_error(e);
    }
    snapshot_response(&state).await
}

/// POST /session/toggle
pub async fn toggle_play_pause(State(state): State<AppState>) -> Response {
    if let Err(e) = state.session.toggle_play_pause().await {
        return session_error(e);
    }
    snapshot_response(&state).await
}

/// PUT /session/sensitivity
pub async fn set_sensitivity(
    State(state): State<AppState>,
    Json(req): Json<SensitivityRequest>,
) -> Response {
    if let Err(e) = state.session.set_sensitivity(req.sensitivity).await {
        return session_error(e);
    }
    snapshot_response(&state).await
}

/// GET /session/history
pub async fn get_history(State(state): State<AppState>) -> Response {
    match state.session.history().await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(e) => session_error(e),
    }
}

/// GET /session/history.csv
/// Download the history; 404 with a notice when nothing is recorded
pub async fn download_history(State(state): State<AppState>) -> Response {
    let history = match state.session.history().await {
        Ok(history) => history,
        Err(e) => {
            error!("Failed to read history: {}", e);
            return session_error(e);
        }
    };

    if history.is_empty() {
        return error_response(StatusCode::NOT_FOUND, EMPTY_HISTORY_NOTICE);
    }

    let body = state.exporter.render(&history);
    info!("Serving CSV export with {} readings", history.len());

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", state.export_filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
