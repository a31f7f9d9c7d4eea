//! The attendance submission flow and its shared state
//!
//! `submission` orchestrates keypad input, verification, duplicate policy
//! and the optimistic commit; `ledger` owns the merged record view;
//! `listener` reconciles the ledger against store deliveries.

pub mod ledger;
pub mod listener;
pub mod submission;

pub use ledger::{AttendanceLedger, LedgerEntry};
pub use listener::spawn_store_listener;
pub use submission::{FlowError, SubmissionFlow, ROLL_WIDTH};
