//! In-process attendance store
//!
//! Default store when no realtime database is configured, and the test
//! double. Enforces the same composite roll+day uniqueness constraint as the
//! remote implementation.

use crate::models::{AttendanceRecord, Student};
use crate::services::store::{AttendanceStore, StoreError, StoreSignal};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, RwLock};

struct Collections {
    attendance: Vec<AttendanceRecord>,
    students: Vec<Student>,
    /// Taken roll+day slots, the uniqueness constraint
    marked: HashSet<(NaiveDate, String)>,
}

/// In-memory push/subscribe store
pub struct MemoryStore {
    collections: RwLock<Collections>,
    signal_tx: broadcast::Sender<StoreSignal>,
    next_key: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (signal_tx, _) = broadcast::channel(64);
        Self {
            collections: RwLock::new(Collections {
                attendance: Vec::new(),
                students: Vec::new(),
                marked: HashSet::new(),
            }),
            signal_tx,
            next_key: AtomicU64::new(1),
        }
    }

    /// Seed a record directly, bypassing the flow (test setup)
    pub async fn seed_attendance(&self, record: AttendanceRecord) {
        let mut collections = self.collections.write().await;
        collections
            .marked
            .insert((record.day(), record.roll.clone()));
        collections.attendance.push(record);
        let _ = self.signal_tx.send(StoreSignal::AttendanceChanged);
    }

    /// Seed a roster entry directly (test setup)
    pub async fn seed_student(&self, student: Student) {
        let mut collections = self.collections.write().await;
        collections.students.push(student);
        let _ = self.signal_tx.send(StoreSignal::StudentsChanged);
    }

    fn assign_key(&self) -> String {
        format!("mem-{:06}", self.next_key.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn append(&self, record: &AttendanceRecord) -> Result<String, StoreError> {
        let mut collections = self.collections.write().await;

        let slot = (record.day(), record.roll.clone());
        if !collections.marked.insert(slot) {
            return Err(StoreError::Duplicate {
                roll: record.roll.clone(),
                day: record.day(),
            });
        }

        collections.attendance.push(record.clone());
        drop(collections);

        let _ = self.signal_tx.send(StoreSignal::AttendanceChanged);
        Ok(self.assign_key())
    }

    async fn add_student(&self, student: &Student) -> Result<String, StoreError> {
        let mut collections = self.collections.write().await;
        collections.students.push(student.clone());
        drop(collections);

        let _ = self.signal_tx.send(StoreSignal::StudentsChanged);
        Ok(self.assign_key())
    }

    async fn fetch_attendance(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self.collections.read().await.attendance.clone())
    }

    async fn fetch_students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.collections.read().await.students.clone())
    }

    fn watch(&self) -> broadcast::Receiver<StoreSignal> {
        self.signal_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record_at(timestamp: chrono::DateTime<Utc>, roll: &str) -> AttendanceRecord {
        AttendanceRecord {
            timestamp,
            roll: roll.to_string(),
            name: None,
            proximity: true,
            verified: true,
        }
    }

    #[tokio::test]
    async fn test_append_enforces_roll_day_uniqueness() {
        let store = MemoryStore::new();
        let morning = Utc.with_ymd_and_hms(2025, 2, 3, 9, 0, 0).unwrap();

        store.append(&record_at(morning, "101")).await.unwrap();

        // Same roll, same day, later time: constraint violation
        let err = store
            .append(&record_at(morning + Duration::hours(4), "101"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));

        // Different roll on the same day is fine
        store.append(&record_at(morning, "102")).await.unwrap();

        // Same roll the next day is fine
        store
            .append(&record_at(morning + Duration::days(1), "101"))
            .await
            .unwrap();

        assert_eq!(store.fetch_attendance().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_append_signals_watchers() {
        let store = MemoryStore::new();
        let mut rx = store.watch();

        let now = Utc.with_ymd_and_hms(2025, 2, 3, 9, 0, 0).unwrap();
        store.append(&record_at(now, "101")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), StoreSignal::AttendanceChanged);
    }

    #[tokio::test]
    async fn test_add_student_signals_roster_change() {
        let store = MemoryStore::new();
        let mut rx = store.watch();

        store
            .add_student(&Student {
                roll: "101".to_string(),
                name: "Asha Rahman".to_string(),
                face_enrolled: true,
            })
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), StoreSignal::StudentsChanged);
        assert_eq!(store.fetch_students().await.unwrap().len(), 1);
    }
}
