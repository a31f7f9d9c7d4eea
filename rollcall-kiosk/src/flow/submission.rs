//! Attendance submission flow
//!
//! Orchestrates one attempt end to end: keypad validation, the
//! verification round trip with its probe/fallback policy, the
//! duplicate-for-today check, the optimistic commit and the remote append.
//! Every failure path returns the keypad to an interactive state; nothing
//! retries automatically.

use crate::flow::ledger::AttendanceLedger;
use crate::models::{AttemptPhase, AttendanceRecord, KeypadView, SubmissionOutcome};
use crate::services::{AttendanceStore, FaceVerifier, StoreError, VerificationOutcome};
use rollcall_common::events::{EventBus, KioskEvent};
use rollcall_common::time::{day_key, now};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Fixed roll-number width
pub const ROLL_WIDTH: usize = 3;

/// Synchronous rejections: no attempt starts, no side effects
#[derive(Debug, Error)]
pub enum FlowError {
    /// Input arrived while the proximity sensor was disabled
    #[error("proximity sensor inactive, enable it first")]
    SensorInactive,

    /// Submit with fewer than the fixed roll width collected
    #[error("enter a valid {ROLL_WIDTH}-digit roll number")]
    IncompleteRoll,

    /// Key outside the 12-key pad
    #[error("unsupported keypad key '{0}'")]
    UnsupportedKey(char),

    /// A submission attempt is already in flight
    #[error("a submission is already in progress")]
    Busy,
}

fn is_keypad_char(key: char) -> bool {
    key.is_ascii_digit() || key == '*' || key == '#'
}

struct KeypadState {
    proximity: bool,
    input: String,
    /// Correlation id of the attempt in flight, if any. A settle whose id
    /// no longer matches is stale and is discarded.
    active_attempt: Option<Uuid>,
}

impl KeypadState {
    fn view(&self) -> KeypadView {
        let phase = if self.active_attempt.is_some() {
            AttemptPhase::Verifying
        } else if !self.input.is_empty() {
            AttemptPhase::Collecting
        } else {
            AttemptPhase::Idle
        };
        KeypadView {
            input: self.input.clone(),
            proximity_enabled: self.proximity,
            phase,
        }
    }
}

/// How verification settled for an accepted attempt
struct Acceptance {
    name: Option<String>,
    verified: bool,
}

/// The core submission flow
///
/// Collaborators are injected capabilities; the flow owns no network or
/// storage details of its own.
pub struct SubmissionFlow {
    keypad: Mutex<KeypadState>,
    ledger: Arc<RwLock<AttendanceLedger>>,
    verifier: Arc<dyn FaceVerifier>,
    store: Arc<dyn AttendanceStore>,
    events: EventBus,
    feedback_pulse_ms: u64,
}

impl SubmissionFlow {
    pub fn new(
        ledger: Arc<RwLock<AttendanceLedger>>,
        verifier: Arc<dyn FaceVerifier>,
        store: Arc<dyn AttendanceStore>,
        events: EventBus,
        feedback_pulse_ms: u64,
    ) -> Self {
        Self {
            keypad: Mutex::new(KeypadState {
                proximity: false,
                input: String::new(),
                active_attempt: None,
            }),
            ledger,
            verifier,
            store,
            events,
            feedback_pulse_ms,
        }
    }

    /// Toggle the proximity sensor gating all input
    pub async fn set_proximity(&self, enabled: bool) -> KeypadView {
        let mut keypad = self.keypad.lock().await;
        keypad.proximity = enabled;
        self.events.emit_lossy(KioskEvent::ProximityChanged {
            enabled,
            timestamp: now(),
        });
        keypad.view()
    }

    /// Collect one keypad character
    ///
    /// Rejected while the sensor is inactive; silently capped once the roll
    /// width is reached.
    pub async fn press_digit(&self, key: char) -> Result<KeypadView, FlowError> {
        if !is_keypad_char(key) {
            return Err(FlowError::UnsupportedKey(key));
        }

        let mut keypad = self.keypad.lock().await;
        if !keypad.proximity {
            return Err(FlowError::SensorInactive);
        }
        if keypad.input.len() < ROLL_WIDTH {
            keypad.input.push(key);
        }
        Ok(keypad.view())
    }

    /// Reset collected digits; always succeeds
    ///
    /// Also cancels an attempt in flight: its settle becomes stale and is
    /// discarded instead of being applied to whatever comes next.
    pub async fn clear(&self) -> KeypadView {
        let mut keypad = self.keypad.lock().await;
        if keypad.active_attempt.take().is_some() {
            tracing::info!("Keypad cleared with an attempt in flight, settle will be discarded");
        }
        keypad.input.clear();
        keypad.view()
    }

    /// Current keypad state for the dashboard
    pub async fn view(&self) -> KeypadView {
        self.keypad.lock().await.view()
    }

    /// Run one submission attempt
    ///
    /// At most one attempt is in flight; the keypad lock is never held
    /// across the network round trips.
    pub async fn submit(&self, skip_verification: bool) -> Result<SubmissionOutcome, FlowError> {
        let (roll, attempt_id) = {
            let mut keypad = self.keypad.lock().await;
            if !keypad.proximity {
                return Err(FlowError::SensorInactive);
            }
            if keypad.active_attempt.is_some() {
                return Err(FlowError::Busy);
            }
            if keypad.input.len() < ROLL_WIDTH {
                return Err(FlowError::IncompleteRoll);
            }
            let attempt_id = Uuid::new_v4();
            keypad.active_attempt = Some(attempt_id);
            (keypad.input.clone(), attempt_id)
        };

        let outcome = self.run_attempt(roll, attempt_id, skip_verification).await;

        let mut keypad = self.keypad.lock().await;
        if keypad.active_attempt == Some(attempt_id) {
            keypad.active_attempt = None;
            // Successful or suppressed attempts clear the pad; rejections
            // leave the roll in place for a manual retry
            if matches!(
                outcome,
                SubmissionOutcome::Committed { .. } | SubmissionOutcome::Duplicate { .. }
            ) {
                keypad.input.clear();
            }
        }
        Ok(outcome)
    }

    async fn run_attempt(
        &self,
        roll: String,
        attempt_id: Uuid,
        skip_verification: bool,
    ) -> SubmissionOutcome {
        let accepted = if skip_verification {
            self.events.emit_lossy(KioskEvent::VerificationBypassed {
                attempt_id,
                roll: roll.clone(),
                reason: "operator skip".to_string(),
                timestamp: now(),
            });
            Acceptance {
                name: Some(self.fallback_name(&roll).await),
                verified: false,
            }
        } else {
            self.events.emit_lossy(KioskEvent::VerificationStarted {
                attempt_id,
                roll: roll.clone(),
                timestamp: now(),
            });

            if !self.verifier.probe().await {
                // Availability over strictness: the kiosk must not block
                // attendance on verification-service downtime
                tracing::warn!(roll = %roll, "Verification service unreachable, marking without verification");
                self.events.emit_lossy(KioskEvent::FaceServiceStatus {
                    available: false,
                    timestamp: now(),
                });
                self.events.emit_lossy(KioskEvent::VerificationBypassed {
                    attempt_id,
                    roll: roll.clone(),
                    reason: "service unreachable".to_string(),
                    timestamp: now(),
                });
                Acceptance {
                    name: Some(self.fallback_name(&roll).await),
                    verified: false,
                }
            } else {
                self.events.emit_lossy(KioskEvent::FaceServiceStatus {
                    available: true,
                    timestamp: now(),
                });
                match self.verifier.verify(&roll).await {
                    VerificationOutcome::Verified { name } => {
                        self.events.emit_lossy(KioskEvent::VerificationPassed {
                            attempt_id,
                            roll: roll.clone(),
                            name: name.clone(),
                            timestamp: now(),
                        });
                        Acceptance {
                            name: Some(name),
                            verified: true,
                        }
                    }
                    VerificationOutcome::Rejected { reason } => {
                        self.events.emit_lossy(KioskEvent::VerificationRejected {
                            attempt_id,
                            roll,
                            reason: reason.clone(),
                            timestamp: now(),
                        });
                        return SubmissionOutcome::Rejected { reason };
                    }
                    VerificationOutcome::TimedOut => {
                        self.events.emit_lossy(KioskEvent::VerificationTimedOut {
                            attempt_id,
                            roll: roll.clone(),
                            timestamp: now(),
                        });
                        return SubmissionOutcome::TimedOut { roll };
                    }
                    VerificationOutcome::Unreachable => {
                        // Service answered the probe but dropped mid-call
                        self.events.emit_lossy(KioskEvent::FaceServiceStatus {
                            available: false,
                            timestamp: now(),
                        });
                        self.events.emit_lossy(KioskEvent::VerificationBypassed {
                            attempt_id,
                            roll: roll.clone(),
                            reason: "service unreachable".to_string(),
                            timestamp: now(),
                        });
                        Acceptance {
                            name: Some(self.fallback_name(&roll).await),
                            verified: false,
                        }
                    }
                }
            }
        };

        // A clear() while the round trip was in flight cancels the attempt
        {
            let keypad = self.keypad.lock().await;
            if keypad.active_attempt != Some(attempt_id) {
                tracing::info!(roll = %roll, attempt_id = %attempt_id, "Discarding stale verification settle");
                return SubmissionOutcome::Cancelled;
            }
        }

        let timestamp = now();
        let day = day_key(timestamp);
        {
            let ledger = self.ledger.read().await;
            if ledger.is_marked(&roll, day) {
                self.events.emit_lossy(KioskEvent::DuplicateSuppressed {
                    roll: roll.clone(),
                    day,
                    timestamp,
                });
                return SubmissionOutcome::Duplicate { roll, day };
            }
        }

        let record = AttendanceRecord {
            timestamp,
            roll: roll.clone(),
            name: accepted.name,
            proximity: true,
            verified: accepted.verified,
        };
        let temp_key = format!("temp-{attempt_id}");

        // Optimistic: visible locally before the append is acknowledged
        self.ledger
            .write()
            .await
            .push_pending(temp_key.clone(), record.clone());
        self.events.emit_lossy(KioskEvent::AttendanceRecorded {
            roll: record.roll.clone(),
            name: record.name.clone(),
            verified: record.verified,
            timestamp,
        });
        self.events.emit_lossy(KioskEvent::FeedbackPulse {
            duration_ms: self.feedback_pulse_ms,
            timestamp,
        });

        match self.store.append(&record).await {
            Ok(key) => {
                self.ledger.write().await.confirm(&temp_key);
                self.events.emit_lossy(KioskEvent::AppendConfirmed {
                    roll: record.roll.clone(),
                    key,
                    timestamp: now(),
                });
                SubmissionOutcome::Committed { record }
            }
            Err(StoreError::Duplicate { roll, day }) => {
                // Lost the race to a concurrent kiosk; the store constraint
                // is authoritative
                self.ledger.write().await.revert(&temp_key);
                self.events.emit_lossy(KioskEvent::DuplicateSuppressed {
                    roll: roll.clone(),
                    day,
                    timestamp: now(),
                });
                SubmissionOutcome::Duplicate { roll, day }
            }
            Err(e) => {
                self.ledger.write().await.revert(&temp_key);
                tracing::error!(roll = %record.roll, error = %e, "Append failed, optimistic entry reverted");
                self.events.emit_lossy(KioskEvent::AppendReverted {
                    roll: record.roll.clone(),
                    reason: e.to_string(),
                    timestamp: now(),
                });
                SubmissionOutcome::AppendFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Display name when verification is bypassed: roster first, then a
    /// synthesized placeholder
    async fn fallback_name(&self, roll: &str) -> String {
        self.ledger
            .read()
            .await
            .lookup_name(roll)
            .unwrap_or_else(|| format!("Student {roll}"))
    }
}
