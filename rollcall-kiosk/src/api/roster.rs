//! Student registration and roster endpoints

use crate::error::{ApiError, ApiResult};
use crate::models::Student;
use crate::services::RegistrationOutcome;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use rollcall_common::events::KioskEvent;
use rollcall_common::time::now;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub roll_number: String,
    pub name: String,
}

/// How a registration request settled
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegistrationResult {
    /// Face samples captured by the verification service
    Enrolled {
        roll: String,
        name: String,
        samples_captured: u32,
    },
    /// Service outage fallback: roster entry written without face data
    RosterOnly { roll: String, name: String },
    /// The service answered and refused enrollment
    Failed { reason: String },
}

/// POST /api/students - register a student
///
/// With the verification service up, enrollment runs there (the service
/// persists its own roster entry). On outage, fall back to a roster-only
/// store write; face samples can be added once the service is back.
pub async fn register_student(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<RegistrationResult>> {
    let roll = request.roll_number.trim().to_string();
    let name = request.name.trim().to_string();
    if roll.is_empty() || name.is_empty() {
        return Err(ApiError::BadRequest(
            "roll number and name are required".to_string(),
        ));
    }

    if state.verifier.probe().await {
        state.events.emit_lossy(KioskEvent::FaceServiceStatus {
            available: true,
            timestamp: now(),
        });

        match state.verifier.register(&roll, &name).await {
            RegistrationOutcome::Enrolled { samples_captured } => {
                tracing::info!(roll = %roll, samples_captured, "Student enrolled with face samples");
                state.events.emit_lossy(KioskEvent::StudentRegistered {
                    roll: roll.clone(),
                    name: name.clone(),
                    face_enrolled: true,
                    timestamp: now(),
                });
                return Ok(Json(RegistrationResult::Enrolled {
                    roll,
                    name,
                    samples_captured,
                }));
            }
            RegistrationOutcome::Failed { reason } => {
                tracing::warn!(roll = %roll, reason = %reason, "Enrollment refused");
                return Ok(Json(RegistrationResult::Failed { reason }));
            }
            // Answered the probe but dropped mid-call: roster-only fallback
            RegistrationOutcome::Unreachable => {}
        }
    } else {
        state.events.emit_lossy(KioskEvent::FaceServiceStatus {
            available: false,
            timestamp: now(),
        });
    }

    let student = Student {
        roll: roll.clone(),
        name: name.clone(),
        face_enrolled: false,
    };
    state.store.add_student(&student).await?;

    tracing::info!(roll = %roll, "Student registered without face data");
    state.events.emit_lossy(KioskEvent::StudentRegistered {
        roll: roll.clone(),
        name: name.clone(),
        face_enrolled: false,
        timestamp: now(),
    });
    Ok(Json(RegistrationResult::RosterOnly { roll, name }))
}

/// GET /api/students - current roster
pub async fn list_students(State(state): State<AppState>) -> Json<Vec<Student>> {
    Json(state.ledger.read().await.roster().to_vec())
}

#[derive(Debug, Serialize)]
pub struct FaceServiceView {
    pub available: bool,
}

/// GET /api/face-service - availability probe result
pub async fn face_service_status(State(state): State<AppState>) -> Json<FaceServiceView> {
    let available = state.verifier.probe().await;
    state.events.emit_lossy(KioskEvent::FaceServiceStatus {
        available,
        timestamp: now(),
    });
    Json(FaceServiceView { available })
}

/// Build roster routes
pub fn roster_routes() -> Router<AppState> {
    Router::new()
        .route("/api/students", get(list_students).post(register_student))
        .route("/api/face-service", get(face_service_status))
}
