//! Derived presentation views

pub mod dashboard;

pub use dashboard::{derive_stats, DashboardStats, StudentSummary};
