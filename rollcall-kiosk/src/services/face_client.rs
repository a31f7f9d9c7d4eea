//! Face-verification service client
//!
//! The verification service is an opaque HTTP dependency with three
//! endpoints: an availability probe, identity verification, and student
//! enrollment. All wait bounds are enforced here, by the caller, with
//! `tokio::time::timeout` wrapping the request future; a request that
//! outlives its bound is abandoned, never retried.

use async_trait::async_trait;
use rollcall_common::events::{EventBus, KioskEvent};
use rollcall_common::time::now;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How often the status monitor re-probes the service
const STATUS_MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// One place for every verification-service wait bound
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    /// Availability probe (`GET /status`)
    pub probe: Duration,
    /// Identity verification (`POST /verify-face`)
    pub verify: Duration,
    /// Enrollment (`POST /register-student`)
    pub register: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(2),
            verify: Duration::from_secs(20),
            register: Duration::from_secs(30),
        }
    }
}

/// How a verification round trip settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Identity confirmed; the service resolved a display name
    Verified { name: String },
    /// The service answered and rejected the attempt
    Rejected { reason: String },
    /// The call exceeded its wait bound
    TimedOut,
    /// The service could not be reached
    Unreachable,
}

/// How an enrollment round trip settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Face samples captured
    Enrolled { samples_captured: u32 },
    /// The service answered and refused enrollment
    Failed { reason: String },
    /// The service could not be reached (caller falls back to a
    /// roster-only registration)
    Unreachable,
}

/// Verification capability consumed by the submission flow
#[async_trait]
pub trait FaceVerifier: Send + Sync {
    /// Availability probe; false on any non-success or timeout
    async fn probe(&self) -> bool;

    /// Identity verification for a roll number
    async fn verify(&self, roll: &str) -> VerificationOutcome;

    /// Enroll a student's face samples
    async fn register(&self, roll: &str, name: &str) -> RegistrationOutcome;
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    roll_number: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    roll_number: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    verified: bool,
    name: Option<String>,
    error: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    success: bool,
    samples_captured: Option<u32>,
    error: Option<String>,
}

/// HTTP client for the face-verification service
pub struct FaceVerificationClient {
    http: reqwest::Client,
    base_url: String,
    timeouts: TimeoutPolicy,
}

impl FaceVerificationClient {
    pub fn new(base_url: &str, timeouts: TimeoutPolicy) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl FaceVerifier for FaceVerificationClient {
    async fn probe(&self) -> bool {
        let request = self.http.get(self.endpoint("/status")).send();
        match timeout(self.timeouts.probe, request).await {
            Ok(Ok(response)) if response.status().is_success() => true,
            Ok(Ok(response)) => {
                debug!(status = %response.status(), "Face service probe rejected");
                false
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Face service probe failed");
                false
            }
            Err(_) => {
                debug!("Face service probe timed out");
                false
            }
        }
    }

    async fn verify(&self, roll: &str) -> VerificationOutcome {
        let request = self
            .http
            .post(self.endpoint("/verify-face"))
            .json(&VerifyRequest { roll_number: roll })
            .send();

        let response = match timeout(self.timeouts.verify, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(roll, error = %e, "Verification request failed");
                return VerificationOutcome::Unreachable;
            }
            Err(_) => {
                warn!(roll, "Verification timed out");
                return VerificationOutcome::TimedOut;
            }
        };

        let body: VerifyResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(roll, error = %e, "Verification response unreadable");
                return VerificationOutcome::Unreachable;
            }
        };

        if body.success && body.verified {
            match body.name {
                Some(name) => VerificationOutcome::Verified { name },
                // Accepted without a name: treat as rejected, the kiosk
                // cannot announce an anonymous match
                None => VerificationOutcome::Rejected {
                    reason: "verification succeeded without a name".to_string(),
                },
            }
        } else {
            let reason = body
                .error
                .or(body.reason)
                .unwrap_or_else(|| "face does not match roll number".to_string());
            VerificationOutcome::Rejected { reason }
        }
    }

    async fn register(&self, roll: &str, name: &str) -> RegistrationOutcome {
        let request = self
            .http
            .post(self.endpoint("/register-student"))
            .json(&RegisterRequest {
                roll_number: roll,
                name,
            })
            .send();

        let response = match timeout(self.timeouts.register, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(roll, error = %e, "Registration request failed");
                return RegistrationOutcome::Unreachable;
            }
            Err(_) => {
                warn!(roll, "Registration timed out");
                return RegistrationOutcome::Unreachable;
            }
        };

        let body: RegisterResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(roll, error = %e, "Registration response unreadable");
                return RegistrationOutcome::Unreachable;
            }
        };

        if body.success {
            RegistrationOutcome::Enrolled {
                samples_captured: body.samples_captured.unwrap_or(0),
            }
        } else {
            RegistrationOutcome::Failed {
                reason: body
                    .error
                    .unwrap_or_else(|| "unable to capture face samples".to_string()),
            }
        }
    }
}

/// Periodically probe the service and emit availability transitions
///
/// Drives the dashboard's online/offline indicator without any request
/// being in flight.
pub fn spawn_status_monitor(verifier: Arc<dyn FaceVerifier>, events: EventBus) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_available: Option<bool> = None;
        loop {
            let available = verifier.probe().await;
            if last_available != Some(available) {
                info!(available, "Face service availability changed");
                events.emit_lossy(KioskEvent::FaceServiceStatus {
                    available,
                    timestamp: now(),
                });
                last_available = Some(available);
            }
            tokio::time::sleep(STATUS_MONITOR_INTERVAL).await;
        }
    })
}
