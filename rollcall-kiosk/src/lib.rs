//! rollcall-kiosk library interface
//!
//! Exposes the submission flow, its collaborators and the HTTP router for
//! integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod flow;
pub mod models;
pub mod services;
pub mod view;

pub use crate::error::{ApiError, ApiResult};

use crate::flow::{spawn_store_listener, AttendanceLedger, SubmissionFlow};
use crate::services::{AttendanceStore, FaceVerifier};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use rollcall_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The core submission flow
    pub flow: Arc<SubmissionFlow>,
    /// Merged attendance state shared with the listener and handlers
    pub ledger: Arc<RwLock<AttendanceLedger>>,
    /// Injected store capability
    pub store: Arc<dyn AttendanceStore>,
    /// Injected verification capability
    pub verifier: Arc<dyn FaceVerifier>,
    /// Event bus for SSE broadcasting
    pub events: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        verifier: Arc<dyn FaceVerifier>,
        events: EventBus,
        feedback_pulse_ms: u64,
    ) -> Self {
        let ledger = Arc::new(RwLock::new(AttendanceLedger::new()));
        let flow = Arc::new(SubmissionFlow::new(
            ledger.clone(),
            verifier.clone(),
            store.clone(),
            events.clone(),
            feedback_pulse_ms,
        ));

        Self {
            flow,
            ledger,
            store,
            verifier,
            events,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Start the store subscription task keeping the ledger converged
    pub fn start_listener(&self) -> JoinHandle<()> {
        spawn_store_listener(self.store.clone(), self.ledger.clone(), self.events.clone())
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::keypad_routes())
        .merge(api::attendance_routes())
        .merge(api::roster_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        // Browser dashboard runs on its own origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
