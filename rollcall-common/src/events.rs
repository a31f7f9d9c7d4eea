//! Event types for the rollcall event system
//!
//! Provides shared event definitions and the EventBus used to fan kiosk
//! activity out to SSE clients and background listeners.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Kiosk event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// All kiosk activity flows through this central enum so consumers can match
/// exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KioskEvent {
    /// Proximity sensor toggled on or off
    ProximityChanged {
        /// New sensor state
        enabled: bool,
        /// When the sensor changed
        timestamp: DateTime<Utc>,
    },

    /// A submission attempt entered face verification
    VerificationStarted {
        /// Correlation id for this attempt
        attempt_id: Uuid,
        /// Roll number under verification
        roll: String,
        /// When verification started
        timestamp: DateTime<Utc>,
    },

    /// Face verification accepted the roll number
    VerificationPassed {
        attempt_id: Uuid,
        roll: String,
        /// Display name returned by the verification service
        name: String,
        timestamp: DateTime<Utc>,
    },

    /// Face verification explicitly rejected the attempt
    ///
    /// Hard failure: no record is created for this attempt.
    VerificationRejected {
        attempt_id: Uuid,
        roll: String,
        /// Service-provided rejection reason
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The verification call exceeded its caller-side timeout
    ///
    /// Surfaced distinctly from rejection; never treated as silent success.
    VerificationTimedOut {
        attempt_id: Uuid,
        roll: String,
        timestamp: DateTime<Utc>,
    },

    /// Attendance accepted without identity verification
    ///
    /// Emitted when the availability probe failed (service outage fallback)
    /// or when the operator explicitly skipped verification.
    VerificationBypassed {
        attempt_id: Uuid,
        roll: String,
        /// Why verification was bypassed
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A same-day re-submission was suppressed
    ///
    /// Policy rejection, not an error: no record is created.
    DuplicateSuppressed {
        roll: String,
        /// Attendance day the roll was already marked present on
        day: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    /// An attendance record was committed locally (optimistic)
    ///
    /// The remote append may still be in flight; AppendConfirmed or
    /// AppendReverted follows.
    AttendanceRecorded {
        roll: String,
        name: Option<String>,
        /// Whether identity verification succeeded for this record
        verified: bool,
        timestamp: DateTime<Utc>,
    },

    /// The remote store acknowledged the append
    AppendConfirmed {
        roll: String,
        /// Durable key assigned by the store
        key: String,
        timestamp: DateTime<Utc>,
    },

    /// The remote append failed and the optimistic entry was reverted
    AppendReverted {
        roll: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The authoritative attendance collection changed
    ///
    /// Emitted after every store snapshot is applied and reconciled.
    AttendanceUpdated {
        /// Number of records in the merged view
        count: usize,
        /// Roll of the newest record, if any
        latest_roll: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Time-boxed kiosk feedback indication (LED/buzzer simulation)
    FeedbackPulse {
        /// How long the indication stays active
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A student was registered
    StudentRegistered {
        roll: String,
        name: String,
        /// False when registration fell back to a roster-only write
        face_enrolled: bool,
        timestamp: DateTime<Utc>,
    },

    /// Face-verification service availability changed or was probed
    FaceServiceStatus {
        available: bool,
        timestamp: DateTime<Utc>,
    },
}

impl KioskEvent {
    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &str {
        match self {
            KioskEvent::ProximityChanged { .. } => "ProximityChanged",
            KioskEvent::VerificationStarted { .. } => "VerificationStarted",
            KioskEvent::VerificationPassed { .. } => "VerificationPassed",
            KioskEvent::VerificationRejected { .. } => "VerificationRejected",
            KioskEvent::VerificationTimedOut { .. } => "VerificationTimedOut",
            KioskEvent::VerificationBypassed { .. } => "VerificationBypassed",
            KioskEvent::DuplicateSuppressed { .. } => "DuplicateSuppressed",
            KioskEvent::AttendanceRecorded { .. } => "AttendanceRecorded",
            KioskEvent::AppendConfirmed { .. } => "AppendConfirmed",
            KioskEvent::AppendReverted { .. } => "AppendReverted",
            KioskEvent::AttendanceUpdated { .. } => "AttendanceUpdated",
            KioskEvent::FeedbackPulse { .. } => "FeedbackPulse",
            KioskEvent::StudentRegistered { .. } => "StudentRegistered",
            KioskEvent::FaceServiceStatus { .. } => "FaceServiceStatus",
        }
    }
}

/// Event bus for broadcasting kiosk events
///
/// Wraps a tokio broadcast channel. Old events are dropped once capacity is
/// exceeded; subscribers only see events emitted after they subscribe.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<KioskEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: KioskEvent,
    ) -> Result<usize, broadcast::error::SendError<KioskEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// For events where it is acceptable that no component is currently
    /// listening (which is the common case before any SSE client connects).
    pub fn emit_lossy(&self, event: KioskEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    #[test]
    fn test_event_type_matches_variant_name() {
        let cases = [
            (
                KioskEvent::ProximityChanged {
                    enabled: true,
                    timestamp: now(),
                },
                "ProximityChanged",
            ),
            (
                KioskEvent::DuplicateSuppressed {
                    roll: "101".to_string(),
                    day: now().date_naive(),
                    timestamp: now(),
                },
                "DuplicateSuppressed",
            ),
            (
                KioskEvent::AttendanceRecorded {
                    roll: "101".to_string(),
                    name: Some("Asha Rahman".to_string()),
                    verified: true,
                    timestamp: now(),
                },
                "AttendanceRecorded",
            ),
            (
                KioskEvent::FaceServiceStatus {
                    available: false,
                    timestamp: now(),
                },
                "FaceServiceStatus",
            ),
        ];

        for (event, expected) in cases {
            assert_eq!(event.event_type(), expected);
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = KioskEvent::AppendConfirmed {
            roll: "042".to_string(),
            key: "-Nabc123".to_string(),
            timestamp: now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AppendConfirmed");
        assert_eq!(json["roll"], "042");
        assert_eq!(json["key"], "-Nabc123");
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit_lossy(KioskEvent::ProximityChanged {
            enabled: true,
            timestamp: now(),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "ProximityChanged");
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(16);
        let result = bus.emit(KioskEvent::FeedbackPulse {
            duration_ms: 2000,
            timestamp: now(),
        });
        assert!(result.is_err());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
