//! Remote attendance store capability
//!
//! The store is a push/subscribe collection log: producers append entries,
//! consumers are signalled on every change and refetch the full collection
//! (full-replace semantics, unordered; consumers re-sort).

use crate::models::{AttendanceRecord, Student};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::broadcast;

/// Which collection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSignal {
    /// The `attendance` collection changed
    AttendanceChanged,
    /// The `students` collection changed
    StudentsChanged,
}

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The roll+day slot is already taken
    ///
    /// Uniqueness is enforced at the store so two kiosks racing past their
    /// local duplicate checks cannot both persist a mark.
    #[error("roll {roll} already marked present on {day}")]
    Duplicate { roll: String, day: NaiveDate },

    /// Transport or status failure talking to the store
    #[error("store request failed: {0}")]
    Request(String),

    /// The store returned a payload that does not parse
    #[error("malformed store payload: {0}")]
    Payload(String),
}

/// Push/subscribe attendance store
///
/// Injected into the flow at construction; implementations are the realtime
/// database client and the in-process store used for tests and demo mode.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Append an attendance record under the `attendance` collection
    ///
    /// Returns the durable key assigned by the store. The store assigns the
    /// authoritative timestamp; the record's client timestamp only survives
    /// until the subscription delivers the stored copy.
    async fn append(&self, record: &AttendanceRecord) -> Result<String, StoreError>;

    /// Write a roster entry under the `students` collection
    async fn add_student(&self, student: &Student) -> Result<String, StoreError>;

    /// Full, unordered attendance snapshot
    async fn fetch_attendance(&self) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Full roster snapshot
    async fn fetch_students(&self) -> Result<Vec<Student>, StoreError>;

    /// Change feed; fires on every collection change
    fn watch(&self) -> broadcast::Receiver<StoreSignal>;
}
