//! Attendance submission and dashboard endpoints

use crate::error::ApiResult;
use crate::flow::LedgerEntry;
use crate::models::SubmissionOutcome;
use crate::view::{derive_stats, DashboardStats};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use rollcall_common::time::{day_key, now};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    /// Mark attendance without the verification round trip (operator skip)
    #[serde(default)]
    pub skip_verification: bool,
}

/// POST /api/attendance/submit - run the submission flow
///
/// Validation failures map to 400/409; a settled attempt always returns 200
/// with its outcome, including policy rejections.
pub async fn submit(
    State(state): State<AppState>,
    request: Option<Json<SubmitRequest>>,
) -> ApiResult<Json<SubmissionOutcome>> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    let outcome = state.flow.submit(request.skip_verification).await?;

    if let SubmissionOutcome::AppendFailed { reason } = &outcome {
        *state.last_error.write().await = Some(reason.clone());
    }

    Ok(Json(outcome))
}

/// GET /api/attendance - merged record list, newest first
pub async fn list_attendance(State(state): State<AppState>) -> Json<Vec<LedgerEntry>> {
    Json(state.ledger.read().await.merged())
}

/// GET /api/dashboard - derived statistics
pub async fn dashboard(State(state): State<AppState>) -> Json<DashboardStats> {
    let ledger = state.ledger.read().await;
    let records: Vec<_> = ledger
        .merged()
        .into_iter()
        .map(|entry| entry.record)
        .collect();
    Json(derive_stats(&records, ledger.roster(), day_key(now())))
}

/// Build attendance routes
pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/attendance", get(list_attendance))
        .route("/api/attendance/submit", post(submit))
        .route("/api/dashboard", get(dashboard))
}
