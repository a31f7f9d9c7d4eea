//! Merged attendance view: authoritative snapshot plus optimistic entries
//!
//! The ledger is the only shared mutable state in the flow. The submission
//! flow prepends pending entries; the store listener replaces the
//! authoritative set wholesale. A store delivery always supersedes matching
//! optimistic entries, keyed by roll+day, so the same logical event never
//! appears twice.

use crate::models::{AttendanceRecord, EntryStatus, Student};
use chrono::NaiveDate;
use serde::Serialize;

/// A record plus its confirmation state, as served to the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub status: EntryStatus,
}

struct PendingEntry {
    key: String,
    record: AttendanceRecord,
    status: EntryStatus,
}

/// Outcome of applying a store snapshot
#[derive(Debug, Clone)]
pub struct SnapshotSummary {
    /// Records in the merged view after the apply
    pub count: usize,
    /// Roll of the newest merged record
    pub latest_roll: Option<String>,
    /// Whether the newest record changed with this delivery
    pub latest_changed: bool,
    /// Optimistic entries superseded by this delivery
    pub superseded: usize,
}

/// Shared attendance state
#[derive(Default)]
pub struct AttendanceLedger {
    /// Store-delivered records, newest first
    authoritative: Vec<AttendanceRecord>,
    /// Locally created entries awaiting their authoritative copy
    pending: Vec<PendingEntry>,
    roster: Vec<Student>,
}

impl AttendanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `roll` is already marked present on `day` in the merged view
    pub fn is_marked(&self, roll: &str, day: NaiveDate) -> bool {
        self.pending
            .iter()
            .any(|entry| entry.record.marks(roll, day))
            || self
                .authoritative
                .iter()
                .any(|record| record.marks(roll, day))
    }

    /// Prepend an optimistic entry under a transient key
    pub fn push_pending(&mut self, key: String, record: AttendanceRecord) {
        self.pending.insert(
            0,
            PendingEntry {
                key,
                record,
                status: EntryStatus::Pending,
            },
        );
    }

    /// Mark an optimistic entry as acknowledged by the store
    pub fn confirm(&mut self, key: &str) -> bool {
        match self.pending.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => {
                entry.status = EntryStatus::Confirmed;
                true
            }
            None => false,
        }
    }

    /// Remove an optimistic entry whose append failed
    pub fn revert(&mut self, key: &str) -> Option<AttendanceRecord> {
        let index = self.pending.iter().position(|entry| entry.key == key)?;
        Some(self.pending.remove(index).record)
    }

    /// Replace the authoritative set with a store delivery
    ///
    /// Records arrive unordered; they are re-sorted newest first here.
    /// Pending entries whose roll+day now appears in the authoritative set
    /// are dropped as superseded.
    pub fn apply_snapshot(&mut self, mut records: Vec<AttendanceRecord>) -> SnapshotSummary {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let previous_latest = self.merged_head_timestamp();

        let before = self.pending.len();
        self.pending.retain(|entry| {
            !records
                .iter()
                .any(|record| record.marks(&entry.record.roll, entry.record.day()))
        });
        let superseded = before - self.pending.len();

        self.authoritative = records;

        let entries = self.merged();
        let latest = entries.first();
        SnapshotSummary {
            count: entries.len(),
            latest_roll: latest.map(|entry| entry.record.roll.clone()),
            latest_changed: latest.map(|entry| entry.record.timestamp) != previous_latest,
            superseded,
        }
    }

    /// Merged view, newest first
    pub fn merged(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self
            .pending
            .iter()
            .map(|entry| LedgerEntry {
                record: entry.record.clone(),
                status: entry.status,
            })
            .chain(self.authoritative.iter().map(|record| LedgerEntry {
                record: record.clone(),
                status: EntryStatus::Authoritative,
            }))
            .collect();
        entries.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));
        entries
    }

    fn merged_head_timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.merged().first().map(|entry| entry.record.timestamp)
    }

    pub fn set_roster(&mut self, roster: Vec<Student>) {
        self.roster = roster;
    }

    pub fn roster(&self) -> &[Student] {
        &self.roster
    }

    /// Roster display name for a roll, if registered
    pub fn lookup_name(&self, roll: &str) -> Option<String> {
        self.roster
            .iter()
            .find(|student| student.roll == roll)
            .map(|student| student.name.clone())
    }
}
