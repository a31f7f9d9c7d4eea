//! Router-level integration tests
//!
//! Exercises the HTTP surface with in-process requests against the
//! in-memory store and a scripted verification service.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::MockVerifier;
use http_body_util::BodyExt;
use rollcall_common::events::EventBus;
use rollcall_kiosk::models::{AttendanceRecord, Student};
use rollcall_kiosk::services::{AttendanceStore, MemoryStore, RegistrationOutcome};
use rollcall_kiosk::{build_router, AppState};
use std::sync::Arc;
use tower::util::ServiceExt;

struct TestApp {
    router: axum::Router,
    state: AppState,
    store: Arc<MemoryStore>,
}

fn test_app(verifier: MockVerifier) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(verifier),
        EventBus::new(64),
        2000,
    );
    TestApp {
        router: build_router(state.clone()),
        state,
        store,
    }
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_module_and_uptime() {
    let app = test_app(MockVerifier::verified("Asha Rahman"));

    let response = app.router.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "rollcall-kiosk");
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn digit_while_sensor_inactive_is_rejected() {
    let app = test_app(MockVerifier::verified("Asha Rahman"));

    let response = app
        .router
        .oneshot(json_request("POST", "/api/keypad/digit", r#"{"key": "1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn keypad_flow_commits_attendance() {
    let app = test_app(MockVerifier::verified("Asha Rahman"));

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/sensor", r#"{"enabled": true}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for key in ["1", "0", "1"] {
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/keypad/digit",
                &format!(r#"{{"key": "{key}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/attendance/submit", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["outcome"], "committed");
    assert_eq!(body["record"]["roll"], "101");
    assert_eq!(body["record"]["name"], "Asha Rahman");
    assert_eq!(body["record"]["verified"], true);

    // The merged list serves the optimistic entry as confirmed
    let response = app
        .router
        .clone()
        .oneshot(get_request("/api/attendance"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["status"], "confirmed");

    assert_eq!(app.store.fetch_attendance().await.unwrap().len(), 1);
}

#[tokio::test]
async fn submit_with_incomplete_roll_is_invalid() {
    let app = test_app(MockVerifier::verified("Asha Rahman"));

    app.router
        .clone()
        .oneshot(json_request("POST", "/api/sensor", r#"{"enabled": true}"#))
        .await
        .unwrap();
    app.router
        .clone()
        .oneshot(json_request("POST", "/api/keypad/digit", r#"{"key": "7"}"#))
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/attendance/submit", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was written
    assert!(app.store.fetch_attendance().await.unwrap().is_empty());
}

#[tokio::test]
async fn multi_character_key_is_rejected() {
    let app = test_app(MockVerifier::verified("Asha Rahman"));

    app.router
        .clone()
        .oneshot(json_request("POST", "/api/sensor", r#"{"enabled": true}"#))
        .await
        .unwrap();

    let response = app
        .router
        .oneshot(json_request("POST", "/api/keypad/digit", r#"{"key": "12"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_derives_rate_from_ledger_state() {
    let app = test_app(MockVerifier::verified("Asha Rahman"));

    {
        let mut ledger = app.state.ledger.write().await;
        ledger.set_roster(vec![
            Student {
                roll: "101".to_string(),
                name: "Asha Rahman".to_string(),
                face_enrolled: true,
            },
            Student {
                roll: "102".to_string(),
                name: "Borhan Uddin".to_string(),
                face_enrolled: true,
            },
        ]);
        ledger.apply_snapshot(vec![AttendanceRecord {
            timestamp: rollcall_common::time::now(),
            roll: "101".to_string(),
            name: Some("Asha Rahman".to_string()),
            proximity: true,
            verified: true,
        }]);
    }

    let response = app
        .router
        .oneshot(get_request("/api/dashboard"))
        .await
        .unwrap();
    let body = body_json(response).await;

    assert_eq!(body["total_students"], 2);
    assert_eq!(body["present_today"], 1);
    assert_eq!(body["attendance_rate"], 50);

    let students = body["students"].as_array().unwrap();
    let absent = students.iter().find(|s| s["roll"] == "102").unwrap();
    assert_eq!(absent["present_today"], false);
}

#[tokio::test]
async fn registration_falls_back_to_roster_only_write() {
    let app = test_app(MockVerifier::offline());

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/students",
            r#"{"roll_number": "105", "name": "Farid Hossain"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["outcome"], "roster_only");

    let students = app.store.fetch_students().await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].roll, "105");
    assert!(!students[0].face_enrolled);
}

#[tokio::test]
async fn registration_with_service_up_enrolls_face_samples() {
    let app = test_app(
        MockVerifier::verified("unused")
            .with_registration(RegistrationOutcome::Enrolled {
                samples_captured: 50,
            }),
    );

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/students",
            r#"{"roll_number": "105", "name": "Farid Hossain"}"#,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "enrolled");
    assert_eq!(body["samples_captured"], 50);

    // The verification service persists its own roster entry; the kiosk
    // writes nothing in this path
    assert!(app.store.fetch_students().await.unwrap().is_empty());
}

#[tokio::test]
async fn registration_requires_roll_and_name() {
    let app = test_app(MockVerifier::verified("Asha Rahman"));

    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/students",
            r#"{"roll_number": "  ", "name": "Farid Hossain"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn face_service_endpoint_reports_probe_result() {
    let app = test_app(MockVerifier::offline());

    let response = app
        .router
        .oneshot(get_request("/api/face-service"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["available"], false);
}
