// Tests for the HTTP control surface, driven through the router directly

mod common;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{sleep_ms, spawn_session, RecordingAlertPlayer, ScriptedBackend, QUIET_BIN};
use quiet_read::error::CaptureError;
use quiet_read::export::{CsvExporter, CSV_HEADER, EMPTY_HISTORY_NOTICE};
use quiet_read::session::SessionHandle;
use quiet_read::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn router(backend: &ScriptedBackend) -> (Router, SessionHandle) {
    let alert = Arc::new(RecordingAlertPlayer::default());
    let (session, _task) = spawn_session(backend, &alert);
    let state = AppState::new(session.clone(), CsvExporter::default());
    (create_router(state), session)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Vec<u8>)> {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => request.body(Body::empty())?,
    };

    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, bytes.to_vec()))
}

async fn send_json(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let (status, bytes) = send(router, method, uri, body).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let (router, _session) = router(&ScriptedBackend::new(QUIET_BIN));

    let (status, body) = send(&router, "GET", "/health", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
    Ok(())
}

#[tokio::test]
async fn test_initial_snapshot_is_setup() -> Result<()> {
    let (router, _session) = router(&ScriptedBackend::new(QUIET_BIN));

    let (status, body) = send_json(&router, "GET", "/session", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "setup");
    assert_eq!(body["sensitivity"], 100);
    assert_eq!(body["remainingSecs"], 0);
    assert_eq!(body["history"], json!([]));
    Ok(())
}

#[tokio::test]
async fn test_start_toggle_and_back() -> Result<()> {
    let (router, session) = router(&ScriptedBackend::new(QUIET_BIN));

    let (status, body) = send_json(
        &router,
        "POST",
        "/session/start",
        Some(json!({ "minutes": 2, "sensitivity": 60 })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "running");
    assert_eq!(body["durationSecs"], 120);
    assert_eq!(body["sensitivity"], 60);

    // A second start is refused while the session runs
    let (status, _) = send_json(
        &router,
        "POST",
        "/session/start",
        Some(json!({ "durationSeconds": 30 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send_json(&router, "POST", "/session/toggle", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "pausedByUser");

    let (status, body) = send_json(&router, "POST", "/session/back", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "setup");
    assert_eq!(body["sensitivity"], 60);

    session.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_invalid_start_is_bad_request() -> Result<()> {
    let (router, _session) = router(&ScriptedBackend::new(QUIET_BIN));

    for body in [
        json!({ "minutes": 0 }),
        json!({ "durationSeconds": -5 }),
        json!({ "minutes": 5, "sensitivity": 0 }),
        json!({ "minutes": 5, "sensitivity": 101 }),
    ] {
        let (status, response) =
            send_json(&router, "POST", "/session/start", Some(body)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].is_string());
    }

    let (_, snapshot) = send_json(&router, "GET", "/session", None).await?;
    assert_eq!(snapshot["phase"], "setup");
    Ok(())
}

#[tokio::test]
async fn test_capture_failure_is_service_unavailable() -> Result<()> {
    let backend = ScriptedBackend::new(QUIET_BIN);
    backend.fail_with(Some(CaptureError::NoDevice));
    let (router, _session) = router(&backend);

    let (status, body) = send_json(
        &router,
        "POST",
        "/session/start",
        Some(json!({ "minutes": 1 })),
    )
    .await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("no audio capture device"));

    let (_, snapshot) = send_json(&router, "GET", "/session", None).await?;
    assert_eq!(snapshot["phase"], "setup");
    assert!(snapshot["captureError"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_sensitivity_update() -> Result<()> {
    let (router, _session) = router(&ScriptedBackend::new(QUIET_BIN));

    let (status, body) = send_json(
        &router,
        "PUT",
        "/session/sensitivity",
        Some(json!({ "sensitivity": 35 })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sensitivity"], 35);

    let (status, _) = send_json(
        &router,
        "PUT",
        "/session/sensitivity",
        Some(json!({ "sensitivity": 500 })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, snapshot) = send_json(&router, "GET", "/session", None).await?;
    assert_eq!(snapshot["sensitivity"], 35);
    Ok(())
}

#[tokio::test]
async fn test_empty_history_download_is_not_found() -> Result<()> {
    let (router, _session) = router(&ScriptedBackend::new(QUIET_BIN));

    let (status, body) = send_json(&router, "GET", "/session/history.csv", None).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], EMPTY_HISTORY_NOTICE);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_history_download_after_ticks() -> Result<()> {
    let (router, session) = router(&ScriptedBackend::new(QUIET_BIN));

    session.start(10, 80).await?;
    sleep_ms(3_500).await;

    let (status, history) = send_json(&router, "GET", "/session/history", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().map(|a| a.len()), Some(3));
    assert!(history[0]["timestamp"].is_string());

    let (status, body) = send(&router, "GET", "/session/history.csv", None).await?;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(body)?;
    let csv = csv.trim_start_matches('\u{feff}');
    assert_eq!(csv.lines().next(), Some(CSV_HEADER));
    assert_eq!(csv.lines().count(), 4);

    session.shutdown().await?;
    Ok(())
}
