//! Realtime database store client
//!
//! Talks to a Firebase Realtime Database over its REST surface:
//! - appends via `POST <base>/attendance.json` with a server-timestamp
//!   sentinel, so the store assigns the authoritative timestamp;
//! - roll+day uniqueness via an ETag-conditional `PUT` on
//!   `attendance_index/<day>/<roll>`, turning the duplicate race into a
//!   412 Precondition Failed;
//! - change feed via a streaming `text/event-stream` GET per collection,
//!   reconnecting with bounded backoff. Consumers refetch the full snapshot
//!   on every signal, so the stream only needs event names, not payloads.

use crate::models::{AttendanceRecord, Student};
use crate::services::store::{AttendanceStore, StoreError, StoreSignal};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const STREAM_RETRY_MAX: Duration = Duration::from_secs(30);

/// Firebase Realtime Database attendance store
pub struct FirebaseStore {
    http: reqwest::Client,
    base_url: String,
    signal_tx: broadcast::Sender<StoreSignal>,
}

/// Response to a push-style POST: the durable key the store assigned
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl FirebaseStore {
    /// Create the store client and start the change streams
    pub fn new(base_url: &str) -> Result<Arc<Self>, StoreError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;
        let (signal_tx, _) = broadcast::channel(64);

        let store = Arc::new(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            signal_tx,
        });

        Self::spawn_change_stream(
            store.http.clone(),
            store.collection_url("attendance"),
            "attendance",
            StoreSignal::AttendanceChanged,
            store.signal_tx.clone(),
        );
        Self::spawn_change_stream(
            store.http.clone(),
            store.collection_url("students"),
            "students",
            StoreSignal::StudentsChanged,
            store.signal_tx.clone(),
        );

        Ok(store)
    }

    fn collection_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path)
    }

    /// Watch a collection for changes and forward signals
    fn spawn_change_stream(
        http: reqwest::Client,
        url: String,
        collection: &'static str,
        signal: StoreSignal,
        tx: broadcast::Sender<StoreSignal>,
    ) {
        tokio::spawn(async move {
            let mut backoff = Duration::from_secs(1);
            loop {
                match http
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "text/event-stream")
                    .send()
                    .await
                {
                    Ok(response) if response.status().is_success() => {
                        info!(collection, "Store change stream connected");
                        backoff = Duration::from_secs(1);

                        let mut stream = response.bytes_stream();
                        let mut buffer = String::new();
                        while let Some(chunk) = stream.next().await {
                            let chunk = match chunk {
                                Ok(chunk) => chunk,
                                Err(e) => {
                                    warn!(collection, error = %e, "Change stream read failed");
                                    break;
                                }
                            };
                            buffer.push_str(&String::from_utf8_lossy(&chunk));

                            while let Some(newline) = buffer.find('\n') {
                                let line = buffer[..newline].trim_end_matches('\r').to_string();
                                buffer.drain(..=newline);

                                if let Some(event) = line.strip_prefix("event:") {
                                    match event.trim() {
                                        "put" | "patch" => {
                                            let _ = tx.send(signal);
                                        }
                                        "keep-alive" => {}
                                        other => {
                                            debug!(collection, event = other, "Ignoring stream event");
                                        }
                                    }
                                }
                            }
                        }
                        warn!(collection, "Store change stream ended, reconnecting");
                    }
                    Ok(response) => {
                        warn!(
                            collection,
                            status = %response.status(),
                            "Store change stream rejected"
                        );
                    }
                    Err(e) => {
                        warn!(collection, error = %e, "Store change stream connect failed");
                    }
                }

                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(STREAM_RETRY_MAX);
            }
        });
    }

    /// Claim the roll+day uniqueness slot with a conditional write
    async fn claim_day_slot(&self, roll: &str, day: NaiveDate) -> Result<(), StoreError> {
        let url = format!(
            "{}/attendance_index/{}/{}.json",
            self.base_url,
            day,
            slot_key(roll)
        );

        let response = self
            .http
            .get(&url)
            .header("X-Firebase-ETag", "true")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Request(format!(
                "slot lookup returned {}",
                response.status()
            )));
        }

        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("null_etag")
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        if body.trim() != "null" {
            return Err(StoreError::Duplicate {
                roll: roll.to_string(),
                day,
            });
        }

        let put = self
            .http
            .put(&url)
            .header(reqwest::header::IF_MATCH, etag)
            .timeout(REQUEST_TIMEOUT)
            .body("true")
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        match put.status() {
            status if status.is_success() => Ok(()),
            reqwest::StatusCode::PRECONDITION_FAILED => Err(StoreError::Duplicate {
                roll: roll.to_string(),
                day,
            }),
            status => Err(StoreError::Request(format!("slot claim returned {status}"))),
        }
    }

    /// Fetch a collection and decode each entry, skipping malformed ones
    async fn fetch_collection<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<T>, StoreError> {
        let response = self
            .http
            .get(&self.collection_url(collection))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Request(format!(
                "{} fetch returned {}",
                collection,
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StoreError::Payload(e.to_string()))?;

        let map = match body {
            // Empty collections come back as JSON null
            serde_json::Value::Null => return Ok(Vec::new()),
            serde_json::Value::Object(map) => map,
            other => {
                return Err(StoreError::Payload(format!(
                    "{} snapshot is not an object: {}",
                    collection, other
                )))
            }
        };

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            match serde_json::from_value::<T>(value) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(collection, key = %key, error = %e, "Skipping malformed entry");
                }
            }
        }
        Ok(entries)
    }
}

/// Index key for a roll number
///
/// Realtime database keys cannot contain `#` (also a URL fragment marker),
/// so the keypad symbols map to stable placeholders.
fn slot_key(roll: &str) -> String {
    roll.chars()
        .map(|c| match c {
            '*' => 's',
            '#' => 'h',
            other => other,
        })
        .collect()
}

#[async_trait]
impl AttendanceStore for FirebaseStore {
    async fn append(&self, record: &AttendanceRecord) -> Result<String, StoreError> {
        self.claim_day_slot(&record.roll, record.day()).await?;

        let mut body = serde_json::to_value(record)
            .map_err(|e| StoreError::Payload(e.to_string()))?;
        // Server-assigned timestamp supersedes the client instant
        body["timestamp"] = serde_json::json!({ ".sv": "timestamp" });

        let response = self
            .http
            .post(&self.collection_url("attendance"))
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Request(format!(
                "append returned {}",
                response.status()
            )));
        }

        let push: PushResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Payload(e.to_string()))?;

        // The stream will also fire, but a refetch is idempotent
        let _ = self.signal_tx.send(StoreSignal::AttendanceChanged);
        Ok(push.name)
    }

    async fn add_student(&self, student: &Student) -> Result<String, StoreError> {
        let response = self
            .http
            .post(&self.collection_url("students"))
            .json(student)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Request(format!(
                "student write returned {}",
                response.status()
            )));
        }

        let push: PushResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Payload(e.to_string()))?;

        let _ = self.signal_tx.send(StoreSignal::StudentsChanged);
        Ok(push.name)
    }

    async fn fetch_attendance(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.fetch_collection("attendance").await
    }

    async fn fetch_students(&self) -> Result<Vec<Student>, StoreError> {
        self.fetch_collection("students").await
    }

    fn watch(&self) -> broadcast::Receiver<StoreSignal> {
        self.signal_tx.subscribe()
    }
}
