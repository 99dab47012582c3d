//! Unit tests for the in-memory delivery backend.

use std::time::{Duration, Instant};

use task_reminder::delivery::{DeliveryBackend, SimulatedBackend, SimulatedTiming};
use task_reminder::models::reminder::ReminderMessage;

fn message(recipient: &str, task_id: &str) -> ReminderMessage {
    ReminderMessage {
        recipient: recipient.into(),
        subject: format!("Reminder for {task_id}"),
        body: "Hello!".into(),
        task_id: task_id.into(),
        task_title: format!("Task {task_id}"),
    }
}

fn backend(seed: u64) -> SimulatedBackend {
    SimulatedBackend::seeded(seed).with_timing(SimulatedTiming::instant())
}

#[tokio::test]
async fn successful_send_gets_tracking_id_and_is_logged() {
    let backend = backend(1);

    let result = backend.send_one(&message("a@x.com", "1")).await;

    assert!(result.success);
    assert!(result.error.is_none());
    let id = result.message_id.expect("tracking id");
    let parts: Vec<&str> = id.splitn(3, '-').collect();
    assert_eq!(parts[0], "sim");
    assert!(parts[1].parse::<i64>().is_ok(), "millis in {id}");
    assert_eq!(parts[2].len(), 9);
    assert!(parts[2]
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));

    let sent = backend.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message_id, id);
    assert_eq!(sent[0].recipient, "a@x.com");
    assert_eq!(sent[0].task_id, "1");
}

#[tokio::test]
async fn same_seed_gives_same_tracking_suffixes() {
    let first = backend(7);
    let second = backend(7);

    for n in 0..3 {
        let task_id = n.to_string();
        let a = first.send_one(&message("a@x.com", &task_id)).await;
        let b = second.send_one(&message("a@x.com", &task_id)).await;
        let suffix = |id: Option<String>| id.and_then(|id| id.rsplit('-').next().map(str::to_owned));
        assert_eq!(suffix(a.message_id), suffix(b.message_id));
    }
}

#[tokio::test]
async fn should_fail_fails_every_send_and_logs_nothing() {
    let backend = backend(1).with_failure_mode(true, 0.0);

    let results = backend
        .send_bulk(&[message("a@x.com", "1"), message("b@x.com", "2")])
        .await;

    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(!result.success);
        assert!(result.message_id.is_none());
        assert_eq!(result.error.as_deref(), Some("simulated delivery failure"));
    }
    assert!(backend.sent_log().is_empty());
}

#[tokio::test]
async fn near_certain_failure_rate_fails() {
    let backend = backend(3);
    backend.set_failure_mode(false, 1.0);

    for n in 0..10 {
        let result = backend.send_one(&message("a@x.com", &n.to_string())).await;
        assert!(!result.success);
    }
}

#[tokio::test]
async fn zero_failure_rate_always_succeeds() {
    let backend = backend(9).with_failure_mode(false, 0.0);

    for n in 0..20 {
        assert!(backend.send_one(&message("a@x.com", &n.to_string())).await.success);
    }
    assert_eq!(backend.sent_log().len(), 20);
}

#[tokio::test]
async fn partial_failure_rate_mixes_outcomes_reproducibly() {
    async fn failures(seed: u64) -> (usize, usize) {
        let backend = backend(seed).with_failure_mode(false, 0.5);
        let mut failed = 0;
        for n in 0..50 {
            if !backend.send_one(&message("a@x.com", &n.to_string())).await.success {
                failed += 1;
            }
        }
        (failed, backend.sent_log().len())
    }

    let (failed, logged) = failures(11).await;
    assert!((1..50).contains(&failed), "{failed} of 50 failed");
    assert_eq!(logged, 50 - failed);
    assert_eq!(failures(11).await, (failed, logged));
}

#[tokio::test]
async fn failure_mode_can_be_switched_off() {
    let backend = backend(1).with_failure_mode(true, 0.0);
    assert!(!backend.send_one(&message("a@x.com", "1")).await.success);

    backend.set_failure_mode(false, f64::NAN);
    assert!(backend.send_one(&message("a@x.com", "2")).await.success);
}

#[tokio::test]
async fn incomplete_message_is_rejected_before_send() {
    let backend = backend(1);
    let mut incomplete = message("a@x.com", "1");
    incomplete.subject = "   ".into();

    let result = backend.send_one(&incomplete).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("missing required field: subject"));
    assert!(backend.sent_log().is_empty());
}

#[tokio::test]
async fn empty_recipient_is_reported_first() {
    let backend = backend(1);
    let incomplete = ReminderMessage {
        recipient: String::new(),
        subject: String::new(),
        body: String::new(),
        task_id: "1".into(),
        task_title: "t".into(),
    };

    let result = backend.send_one(&incomplete).await;
    assert_eq!(result.error.as_deref(), Some("missing required field: recipient"));
}

#[tokio::test]
async fn bulk_send_preserves_order_and_continues_past_failures() {
    let backend = backend(5);
    let mut broken = message("b@x.com", "2");
    broken.body = String::new();
    let batch = [message("a@x.com", "1"), broken, message("c@x.com", "3")];

    let results = backend.send_bulk(&batch).await;

    let recipients: Vec<&str> = results.iter().map(|r| r.recipient.as_str()).collect();
    assert_eq!(recipients, ["a@x.com", "b@x.com", "c@x.com"]);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[2].success);
}

#[tokio::test]
async fn empty_bulk_send_returns_nothing() {
    let backend = backend(1);
    assert!(backend.send_bulk(&[]).await.is_empty());
    assert!(backend.sent_log().is_empty());
}

#[tokio::test]
async fn stats_and_history_reflect_sent_log() {
    let backend = backend(2);
    backend.send_one(&message("a@x.com", "1")).await;
    backend.send_one(&message("a@x.com", "2")).await;
    backend.send_one(&message("b@x.com", "3")).await;

    let stats = backend.stats();
    assert_eq!(stats.total_sent, 3);
    assert_eq!(stats.unique_recipients, 2);
    assert_eq!(stats.last_sent, backend.sent_messages().last().map(|m| m.timestamp));

    let shared = backend.sent_log();
    backend.clear_history();
    assert!(shared.is_empty());
    let stats = backend.stats();
    assert_eq!(stats.total_sent, 0);
    assert!(stats.last_sent.is_none());
}

#[tokio::test]
async fn verify_connectivity_always_succeeds_and_needs_no_preflight() {
    let backend = backend(1);
    assert!(backend.verify_connectivity().await);
    assert!(!backend.requires_preflight());
    assert_eq!(backend.name(), "simulated");
}

#[tokio::test]
async fn bulk_send_pauses_only_between_sends() {
    let timing = SimulatedTiming {
        send_interval: Duration::from_millis(300),
        ..SimulatedTiming::instant()
    };
    let backend = SimulatedBackend::seeded(1).with_timing(timing);
    let started = Instant::now();

    backend
        .send_bulk(&[
            message("a@x.com", "1"),
            message("b@x.com", "2"),
            message("c@x.com", "3"),
        ])
        .await;

    // Two gaps for three sends.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(900), "{elapsed:?}");
}
