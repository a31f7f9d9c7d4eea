//! Shared test doubles for the integration suites
//!
//! Each integration crate uses a different subset of the scripted outcomes.
#![allow(dead_code)]

use async_trait::async_trait;
use rollcall_kiosk::services::{FaceVerifier, RegistrationOutcome, VerificationOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted verification service
///
/// Probe availability and round-trip outcomes are fixed at construction;
/// call counters let tests assert which round trips actually ran.
pub struct MockVerifier {
    available: bool,
    outcome: VerificationOutcome,
    registration: RegistrationOutcome,
    delay: Option<Duration>,
    pub probe_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
}

impl MockVerifier {
    pub fn verified(name: &str) -> Self {
        Self::with_outcome(
            true,
            VerificationOutcome::Verified {
                name: name.to_string(),
            },
        )
    }

    pub fn rejected(reason: &str) -> Self {
        Self::with_outcome(
            true,
            VerificationOutcome::Rejected {
                reason: reason.to_string(),
            },
        )
    }

    pub fn timed_out() -> Self {
        Self::with_outcome(true, VerificationOutcome::TimedOut)
    }

    /// Probe fails: the kiosk falls back to unverified marking
    pub fn offline() -> Self {
        Self::with_outcome(false, VerificationOutcome::Unreachable)
    }

    pub fn with_outcome(available: bool, outcome: VerificationOutcome) -> Self {
        Self {
            available,
            outcome,
            registration: RegistrationOutcome::Unreachable,
            delay: None,
            probe_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_registration(mut self, registration: RegistrationOutcome) -> Self {
        self.registration = registration;
        self
    }

    /// Delay the verify round trip (for cancellation tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl FaceVerifier for MockVerifier {
    async fn probe(&self) -> bool {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.available
    }

    async fn verify(&self, _roll: &str) -> VerificationOutcome {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }

    async fn register(&self, _roll: &str, _name: &str) -> RegistrationOutcome {
        self.registration.clone()
    }
}
