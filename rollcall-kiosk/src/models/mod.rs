//! Domain models for the rollcall kiosk

pub mod attempt;
pub mod attendance;
pub mod roster;

pub use attempt::{AttemptPhase, KeypadView, SubmissionOutcome};
pub use attendance::{AttendanceRecord, EntryStatus};
pub use roster::Student;
