//! Cron route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::info;

use crate::cron::{CronResult, LastCronRun};
use crate::error::AppResult;
use crate::host::ScheduledHook;
use crate::state::AppState;

/// Create the public cron trigger router.
pub fn router() -> Router<AppState> {
    Router::new().route("/cron/{key}", post(run_cron))
}

/// Create the cron status router. Mounted behind editor authentication.
pub fn status_router() -> Router<AppState> {
    Router::new().route("/cron/status", get(cron_status))
}

/// Cron run response.
#[derive(Debug, Serialize)]
pub struct CronResponse {
    pub status: String,
    pub tasks: Option<Vec<String>>,
    pub duration_ms: Option<u64>,
    pub message: Option<String>,
}

/// Run cron tasks (protected by secret key).
async fn run_cron(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    if key != state.config().cron_key {
        info!("invalid cron key");
        return (
            StatusCode::FORBIDDEN,
            Json(CronResponse {
                status: "error".to_string(),
                tasks: None,
                duration_ms: None,
                message: Some("Invalid cron key".to_string()),
            }),
        )
            .into_response();
    }

    info!("cron triggered via HTTP");
    let result = state.cron().run().await;

    match result {
        CronResult::Completed {
            tasks_run,
            duration_ms,
        } => (
            StatusCode::OK,
            Json(CronResponse {
                status: "completed".to_string(),
                tasks: Some(tasks_run),
                duration_ms: Some(duration_ms),
                message: None,
            }),
        )
            .into_response(),
        CronResult::Skipped => (
            StatusCode::OK,
            Json(CronResponse {
                status: "skipped".to_string(),
                tasks: None,
                duration_ms: None,
                message: Some("A cron run is already in progress".to_string()),
            }),
        )
            .into_response(),
        CronResult::Failed(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CronResponse {
                status: "failed".to_string(),
                tasks: None,
                duration_ms: None,
                message: Some(message),
            }),
        )
            .into_response(),
    }
}

/// Cron status response.
#[derive(Debug, Serialize)]
pub struct CronStatus {
    pub last_run: Option<LastCronRun>,
    pub scheduled: Vec<ScheduledHook>,
}

/// Last run and next scheduled runs.
///
/// GET /cron/status
async fn cron_status(State(state): State<AppState>) -> AppResult<Json<CronStatus>> {
    Ok(Json(CronStatus {
        last_run: state.cron().last_run(),
        scheduled: state.cron().schedule().await?,
    }))
}
