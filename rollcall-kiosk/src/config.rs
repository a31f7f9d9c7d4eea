//! Configuration resolution for rollcall-kiosk
//!
//! Settings resolve CLI → environment → TOML → compiled default.

use crate::services::TimeoutPolicy;
use clap::Parser;
use rollcall_common::config::{load_toml_config, resolve_value};
use rollcall_common::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5180";
pub const DEFAULT_FACE_SERVICE_URL: &str = "http://localhost:5001";
pub const DEFAULT_FEEDBACK_PULSE_MS: u64 = 2000;

/// Command-line arguments
#[derive(Debug, Default, Parser)]
#[command(name = "rollcall-kiosk", about = "Classroom attendance kiosk service")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "ROLLCALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address for the HTTP API
    #[arg(long)]
    pub bind: Option<String>,

    /// Realtime store base URL (in-memory store when absent)
    #[arg(long)]
    pub store_url: Option<String>,

    /// Face-verification service base URL
    #[arg(long)]
    pub face_service_url: Option<String>,
}

/// Resolved kiosk configuration
#[derive(Debug, Clone)]
pub struct KioskConfig {
    pub bind_addr: SocketAddr,
    pub store_url: Option<String>,
    pub face_service_url: String,
    pub timeouts: TimeoutPolicy,
    pub feedback_pulse_ms: u64,
}

impl KioskConfig {
    /// Resolve the full configuration from CLI, environment and TOML
    pub fn resolve(cli: Cli) -> rollcall_common::Result<Self> {
        let toml_config = load_toml_config(cli.config.as_deref())?;

        let bind = resolve_value(cli.bind, "ROLLCALL_BIND_ADDR", toml_config.bind_addr.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{bind}': {e}")))?;

        let store_url = resolve_value(
            cli.store_url,
            "ROLLCALL_STORE_URL",
            toml_config.store_url.clone(),
        );

        let face_service_url = resolve_value(
            cli.face_service_url,
            "ROLLCALL_FACE_SERVICE_URL",
            toml_config.face_service_url.clone(),
        )
        .unwrap_or_else(|| DEFAULT_FACE_SERVICE_URL.to_string());

        let overrides = toml_config.timeouts.unwrap_or_default();
        let defaults = TimeoutPolicy::default();
        let timeouts = TimeoutPolicy {
            probe: overrides
                .probe_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.probe),
            verify: overrides
                .verify_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.verify),
            register: overrides
                .register_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.register),
        };

        let feedback_pulse_ms = toml_config
            .feedback_pulse_ms
            .unwrap_or(DEFAULT_FEEDBACK_PULSE_MS);

        Ok(Self {
            bind_addr,
            store_url,
            face_service_url,
            timeouts,
            feedback_pulse_ms,
        })
    }
}
