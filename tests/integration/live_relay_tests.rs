//! Live backend tests against an in-process fake mail relay.
//!
//! The relay checks basic auth, records every accepted mail, and can be
//! told to reject the handshake or a specific recipient.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use task_reminder::config::LiveConfig;
use task_reminder::delivery::{DeliveryBackend, LiveMailBackend, SenderCredentials};
use task_reminder::models::reminder::ReminderMessage;
use task_reminder::AppError;

use super::test_helpers::{pipeline, reference_date, task};

/// `sender@example.com:hunter2`
const EXPECTED_AUTH: &str = "Basic c2VuZGVyQGV4YW1wbGUuY29tOmh1bnRlcjI=";
const REJECTED_RECIPIENT: &str = "bounce@example.com";
const GARBLED_RECIPIENT: &str = "garbled@example.com";

#[derive(Clone, Default)]
struct RelayState {
    accepted: Arc<Mutex<Vec<Value>>>,
    handshake_down: bool,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(EXPECTED_AUTH)
}

async fn verify(State(state): State<RelayState>, headers: HeaderMap) -> StatusCode {
    if !authorized(&headers) {
        StatusCode::UNAUTHORIZED
    } else if state.handshake_down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn send(
    State(state): State<RelayState>,
    headers: HeaderMap,
    Json(mail): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let to = mail["to"].as_str().unwrap_or_default().to_owned();
    match to.as_str() {
        REJECTED_RECIPIENT => {
            (StatusCode::INTERNAL_SERVER_ERROR, "mailbox unavailable").into_response()
        }
        GARBLED_RECIPIENT => (StatusCode::OK, "queued").into_response(),
        _ => {
            let mut accepted = state.accepted.lock().unwrap();
            accepted.push(mail);
            Json(json!({ "message_id": format!("relay-{}", accepted.len()) })).into_response()
        }
    }
}

/// Start the fake relay and return its base URL.
async fn start_relay(state: RelayState) -> String {
    let app = Router::new()
        .route("/verify", get(verify))
        .route("/send", post(send))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
    let addr = listener.local_addr().expect("relay addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("relay serves");
    });
    format!("http://{addr}/")
}

fn backend(endpoint: String, secret: &str) -> LiveMailBackend {
    let config = LiveConfig {
        endpoint,
        sender_name: "Course Reminders".into(),
        send_interval_ms: 0,
        request_timeout_seconds: 5,
    };
    LiveMailBackend::new(&config, SenderCredentials::new("sender@example.com", secret))
        .expect("backend builds")
}

fn message(recipient: &str) -> ReminderMessage {
    ReminderMessage {
        recipient: recipient.into(),
        subject: "Reminder: <Essay>".into(),
        body: "Hello!\n\nDue today.".into(),
        task_id: "1".into(),
        task_title: "Essay".into(),
    }
}

#[tokio::test]
async fn handshake_succeeds_with_valid_credentials() {
    let endpoint = start_relay(RelayState::default()).await;
    assert!(backend(endpoint, "hunter2").verify_connectivity().await);
}

#[tokio::test]
async fn handshake_fails_with_wrong_secret() {
    let endpoint = start_relay(RelayState::default()).await;
    assert!(!backend(endpoint, "wrong").verify_connectivity().await);
}

#[tokio::test]
async fn handshake_fails_when_relay_is_down() {
    let state = RelayState {
        handshake_down: true,
        ..RelayState::default()
    };
    let endpoint = start_relay(state).await;
    assert!(!backend(endpoint, "hunter2").verify_connectivity().await);
}

#[tokio::test]
async fn send_posts_text_and_html_parts() {
    let state = RelayState::default();
    let endpoint = start_relay(state.clone()).await;

    let result = backend(endpoint, "hunter2")
        .send_one(&message("a@x.com"))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.message_id.as_deref(), Some("relay-1"));

    let accepted = state.accepted.lock().unwrap();
    let mail = &accepted[0];
    assert_eq!(mail["to"], "a@x.com");
    assert_eq!(mail["from"]["name"], "Course Reminders");
    assert_eq!(mail["from"]["address"], "sender@example.com");
    assert_eq!(mail["subject"], "Reminder: <Essay>");
    assert_eq!(mail["text"], "Hello!\n\nDue today.");
    let html = mail["html"].as_str().expect("html part");
    assert!(html.contains("Reminder: &lt;Essay&gt;"));
    assert!(html.contains("Hello!<br>"));
}

#[tokio::test]
async fn relay_error_status_becomes_failed_result() {
    let endpoint = start_relay(RelayState::default()).await;

    let result = backend(endpoint, "hunter2")
        .send_one(&message(REJECTED_RECIPIENT))
        .await;

    assert!(!result.success);
    let error = result.error.expect("error text");
    assert!(error.contains("500"), "{error}");
    assert!(error.contains("mailbox unavailable"), "{error}");
}

#[tokio::test]
async fn unreadable_receipt_is_a_failure() {
    let endpoint = start_relay(RelayState::default()).await;

    let result = backend(endpoint, "hunter2")
        .send_one(&message(GARBLED_RECIPIENT))
        .await;

    assert!(!result.success);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|e| e.contains("unreadable relay receipt")));
}

#[tokio::test]
async fn pipeline_delivers_through_relay_and_isolates_failures() {
    let state = RelayState::default();
    let endpoint = start_relay(state.clone()).await;
    let today = reference_date();
    let mut bounced = task("2", today, "medium");
    bounced.recipient = REJECTED_RECIPIENT.into();
    let pipeline = pipeline(
        vec![task("1", today, "alta"), bounced, task("3", today, "baixa")],
        Arc::new(backend(endpoint, "hunter2")),
    );

    let report = pipeline.run_with_fixed_date(today).await.expect("run");

    assert_eq!(report.total_due_today, 3);
    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 1);
    assert!(!report.results[1].success);
    assert_eq!(state.accepted.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn pipeline_aborts_when_handshake_fails() {
    let state = RelayState {
        handshake_down: true,
        ..RelayState::default()
    };
    let endpoint = start_relay(state.clone()).await;
    let pipeline = pipeline(
        vec![task("1", reference_date(), "high")],
        Arc::new(backend(endpoint, "hunter2")),
    );

    let err = pipeline
        .run_with_fixed_date(reference_date())
        .await
        .expect_err("handshake fails");

    assert!(matches!(err, AppError::Connectivity(_)));
    assert!(state.accepted.lock().unwrap().is_empty());
}
