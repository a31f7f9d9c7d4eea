//! Submission attempt state machine types
//!
//! An attempt progresses Idle → Collecting → Verifying and settles in one of
//! the `SubmissionOutcome` variants. Terminal outcomes return the keypad to
//! an interactive state; nothing retries automatically.

use crate::models::AttendanceRecord;
use chrono::NaiveDate;
use serde::Serialize;

/// Persistent keypad phase between requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    /// No digits collected, nothing in flight
    Idle,
    /// Digits collected, awaiting submit
    Collecting,
    /// Submission in flight (verification or remote append)
    Verifying,
}

/// Keypad state as reported to the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct KeypadView {
    /// Digits collected so far (at most the roll width)
    pub input: String,
    /// Proximity sensor state gating all input
    pub proximity_enabled: bool,
    /// Current attempt phase
    pub phase: AttemptPhase,
}

/// How a submission attempt settled
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Record created and appended (or append in a known failure state
    /// reported separately); verification result is on the record
    Committed { record: AttendanceRecord },
    /// Same roll already marked present on this attendance day
    Duplicate { roll: String, day: NaiveDate },
    /// The verification service explicitly rejected the attempt
    Rejected { reason: String },
    /// The verification call exceeded its caller-side bound
    TimedOut { roll: String },
    /// The attempt was superseded (cleared) before it settled
    Cancelled,
    /// The remote append failed; the optimistic entry was reverted
    AppendFailed { reason: String },
}
