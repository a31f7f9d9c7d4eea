//! Keypad and proximity-sensor endpoints

use crate::error::{ApiError, ApiResult};
use crate::models::KeypadView;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SensorRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct DigitRequest {
    /// Single keypad character: digit, `*` or `#`
    pub key: String,
}

/// POST /api/sensor - toggle the proximity sensor
pub async fn set_sensor(
    State(state): State<AppState>,
    Json(request): Json<SensorRequest>,
) -> Json<KeypadView> {
    Json(state.flow.set_proximity(request.enabled).await)
}

/// GET /api/keypad - current keypad state
pub async fn keypad_state(State(state): State<AppState>) -> Json<KeypadView> {
    Json(state.flow.view().await)
}

/// POST /api/keypad/digit - collect one keypad character
pub async fn press_digit(
    State(state): State<AppState>,
    Json(request): Json<DigitRequest>,
) -> ApiResult<Json<KeypadView>> {
    let mut chars = request.key.chars();
    let key = match (chars.next(), chars.next()) {
        (Some(key), None) => key,
        _ => {
            return Err(ApiError::BadRequest(
                "key must be a single keypad character".to_string(),
            ))
        }
    };

    Ok(Json(state.flow.press_digit(key).await?))
}

/// POST /api/keypad/clear - reset collected digits
pub async fn clear_input(State(state): State<AppState>) -> Json<KeypadView> {
    Json(state.flow.clear().await)
}

/// Build keypad routes
pub fn keypad_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sensor", post(set_sensor))
        .route("/api/keypad", get(keypad_state))
        .route("/api/keypad/digit", post(press_digit))
        .route("/api/keypad/clear", post(clear_input))
}
