// HTTP route handlers for the Gauntlet API

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use gauntlet_common::{BatchResult, FailureKind, Language, TestCase};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{metrics, AppState};

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub code: String,
    pub language: String,
    pub test_case: TestCase,
}

fn reject(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Resolve a language name against the configured runtimes
fn resolve_language(state: &AppState, raw: &str) -> Result<Language, Response> {
    match Language::from_str(raw) {
        Some(language) if state.runtimes.is_enabled(language) => Ok(language),
        _ => {
            warn!(language = raw, "Rejected request for unsupported language");
            Err(reject(
                StatusCode::BAD_REQUEST,
                format!("unsupported language: {}", raw),
            ))
        }
    }
}

/// Transport-level failures surface as gateway errors; everything else is 200
fn status_for(result: &BatchResult) -> StatusCode {
    match result.error_kind {
        Some(FailureKind::RateLimited) => StatusCode::SERVICE_UNAVAILABLE,
        Some(FailureKind::Transport) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    }
}

fn respond(request_id: Uuid, language: Language, result: BatchResult, started: Instant) -> Response {
    let elapsed = started.elapsed().as_secs_f64();
    metrics::record_execution(&language.to_string(), &result, elapsed);

    info!(
        %request_id,
        %language,
        success = result.success,
        passed = result.tests_passed,
        total = result.total_tests,
        elapsed_ms = (elapsed * 1000.0) as u64,
        "Request completed"
    );

    (status_for(&result), Json(result)).into_response()
}

/// POST /execute - Run a batch of test cases
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteRequest>,
) -> Response {
    let request_id = Uuid::new_v4();
    let language = match resolve_language(&state, &payload.language) {
        Ok(language) => language,
        Err(response) => return response,
    };

    info!(
        %request_id,
        %language,
        cases = payload.test_cases.len(),
        "Execute request received"
    );

    let started = Instant::now();
    let result = state
        .executor
        .execute(&payload.code, language, &payload.test_cases)
        .await;

    respond(request_id, language, result, started)
}

/// POST /run - Run a single test case
pub async fn run_single(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunRequest>,
) -> Response {
    let request_id = Uuid::new_v4();
    let language = match resolve_language(&state, &payload.language) {
        Ok(language) => language,
        Err(response) => return response,
    };

    info!(%request_id, %language, "Run request received");

    let started = Instant::now();
    let result = state
        .executor
        .execute_single(&payload.code, language, &payload.test_case)
        .await;

    respond(request_id, language, result, started)
}

/// POST /cache/clear - Drop both cache tiers
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.executor.clear_cache();
    Json(json!({ "cleared": true }))
}

/// GET /health - Liveness with uptime
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let languages: Vec<String> = state
        .runtimes
        .enabled_languages()
        .iter()
        .map(|l| l.to_string())
        .collect();

    Json(json!({
        "status": "ok",
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "languages": languages,
    }))
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    metrics::update_cache_metrics(&state.executor.cache_stats());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}
