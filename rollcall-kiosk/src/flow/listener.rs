//! Store subscription task
//!
//! Subscribes to the store's change feed and keeps the ledger converged:
//! every signal triggers a full snapshot refetch, a re-sort, and
//! reconciliation of optimistic entries. The authoritative delivery always
//! supersedes local state.

use crate::flow::ledger::AttendanceLedger;
use crate::services::{AttendanceStore, StoreSignal};
use rollcall_common::events::{EventBus, KioskEvent};
use rollcall_common::time::now;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Start the listener; runs until the store's signal channel closes
pub fn spawn_store_listener(
    store: Arc<dyn AttendanceStore>,
    ledger: Arc<RwLock<AttendanceLedger>>,
    events: EventBus,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut signals = store.watch();

        // Prime both collections before the first signal
        refresh_students(&store, &ledger).await;
        refresh_attendance(&store, &ledger, &events).await;
        info!("Store listener started");

        loop {
            match signals.recv().await {
                Ok(StoreSignal::AttendanceChanged) => {
                    refresh_attendance(&store, &ledger, &events).await;
                }
                Ok(StoreSignal::StudentsChanged) => {
                    refresh_students(&store, &ledger).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Snapshots are full-replace, so catching up is one
                    // refetch of each collection
                    warn!(skipped, "Store signals lagged, refreshing both collections");
                    refresh_students(&store, &ledger).await;
                    refresh_attendance(&store, &ledger, &events).await;
                }
                Err(RecvError::Closed) => {
                    info!("Store signal channel closed, listener stopping");
                    break;
                }
            }
        }
    })
}

async fn refresh_attendance(
    store: &Arc<dyn AttendanceStore>,
    ledger: &Arc<RwLock<AttendanceLedger>>,
    events: &EventBus,
) {
    match store.fetch_attendance().await {
        Ok(records) => {
            let summary = ledger.write().await.apply_snapshot(records);
            if summary.superseded > 0 {
                debug!(
                    superseded = summary.superseded,
                    "Authoritative delivery superseded optimistic entries"
                );
            }
            events.emit_lossy(KioskEvent::AttendanceUpdated {
                count: summary.count,
                latest_roll: summary.latest_roll,
                timestamp: now(),
            });
        }
        Err(e) => {
            warn!(error = %e, "Attendance snapshot refresh failed");
        }
    }
}

async fn refresh_students(store: &Arc<dyn AttendanceStore>, ledger: &Arc<RwLock<AttendanceLedger>>) {
    match store.fetch_students().await {
        Ok(students) => {
            debug!(count = students.len(), "Roster snapshot applied");
            ledger.write().await.set_roster(students);
        }
        Err(e) => {
            warn!(error = %e, "Roster snapshot refresh failed");
        }
    }
}
