//! rollcall-kiosk - Classroom Attendance Kiosk Service
//!
//! Keypad-driven attendance submission with face verification, duplicate
//! suppression and a live dashboard feed. Persistence is delegated to an
//! external realtime store; identity verification to an external HTTP
//! service. Both are injected capabilities.

use anyhow::Result;
use clap::Parser;
use rollcall_common::events::EventBus;
use rollcall_kiosk::config::{Cli, KioskConfig};
use rollcall_kiosk::services::{
    spawn_status_monitor, AttendanceStore, FaceVerificationClient, FaceVerifier, FirebaseStore,
    MemoryStore,
};
use rollcall_kiosk::AppState;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting rollcall-kiosk (attendance kiosk) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = KioskConfig::resolve(cli)?;

    let store: Arc<dyn AttendanceStore> = match &config.store_url {
        Some(url) => {
            info!(url = %url, "Using realtime database store");
            FirebaseStore::new(url)?
        }
        None => {
            warn!("No store URL configured, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let verifier: Arc<dyn FaceVerifier> = Arc::new(FaceVerificationClient::new(
        &config.face_service_url,
        config.timeouts,
    )?);
    info!(url = %config.face_service_url, "Face-verification service configured");

    let events = EventBus::new(100);

    let state = AppState::new(store, verifier.clone(), events.clone(), config.feedback_pulse_ms);
    let _listener = state.start_listener();
    let _monitor = spawn_status_monitor(verifier, events);

    let app = rollcall_kiosk::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
