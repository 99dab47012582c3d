//! Unit tests for task, report, and delivery result models.

use chrono::NaiveDate;

use task_reminder::models::delivery::DeliveryResult;
use task_reminder::models::reminder::ReminderMessage;
use task_reminder::models::report::RunReport;
use task_reminder::models::task::{Priority, Task};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn priority_recognizes_english_and_store_spellings() {
    assert_eq!(Priority::from("high"), Priority::High);
    assert_eq!(Priority::from("alta"), Priority::High);
    assert_eq!(Priority::from("MEDIUM"), Priority::Medium);
    assert_eq!(Priority::from("media"), Priority::Medium);
    assert_eq!(Priority::from("média"), Priority::Medium);
    assert_eq!(Priority::from("low"), Priority::Low);
    assert_eq!(Priority::from("baixa"), Priority::Low);
}

#[test]
fn priority_keeps_unrecognized_value_verbatim() {
    let priority = Priority::from("urgent");
    assert_eq!(priority, Priority::Unrecognized("urgent".into()));
    assert_eq!(priority.as_str(), "urgent");
}

#[test]
fn task_deserializes_store_format_with_email_key() {
    let raw = r#"{
        "id": "1",
        "title": "Thesis draft",
        "description": "Finish chapter 3",
        "dueDate": "2024-03-10",
        "email": "student@example.com",
        "priority": "alta"
    }"#;

    let task: Task = serde_json::from_str(raw).expect("task parses");

    assert_eq!(task.id, "1");
    assert_eq!(task.title, "Thesis draft");
    assert_eq!(task.description.as_deref(), Some("Finish chapter 3"));
    assert_eq!(task.due_date, date(2024, 3, 10));
    assert_eq!(task.recipient, "student@example.com");
    assert_eq!(task.priority, Priority::High);
}

#[test]
fn task_accepts_recipient_key_and_missing_optionals() {
    let raw = r#"{"id":"x","title":"T","dueDate":"2024-01-02","recipient":"a@x.com"}"#;

    let task: Task = serde_json::from_str(raw).expect("task parses");

    assert!(task.description.is_none());
    assert_eq!(task.priority, Priority::default());
    assert!(matches!(task.priority, Priority::Unrecognized(_)));
}

#[test]
fn task_rejects_invalid_due_date() {
    let raw = r#"{"id":"x","title":"T","dueDate":"10/03/2024","recipient":"a@x.com"}"#;
    assert!(serde_json::from_str::<Task>(raw).is_err());
}

#[test]
fn task_serializes_priority_as_string() {
    let task = Task::new("7", "Slides", date(2024, 5, 1), "a@x.com", Priority::Medium);
    let json = serde_json::to_value(&task).expect("serializes");
    assert_eq!(json["priority"], "medium");
    assert_eq!(json["dueDate"], "2024-05-01");
    assert!(json.get("description").is_none());
}

#[test]
fn delivery_result_constructors_keep_id_and_error_exclusive() {
    let ok = DeliveryResult::delivered("a@x.com", "id-1");
    assert!(ok.success);
    assert_eq!(ok.message_id.as_deref(), Some("id-1"));
    assert!(ok.error.is_none());

    let failed = DeliveryResult::failed("a@x.com", "boom");
    assert!(!failed.success);
    assert!(failed.message_id.is_none());
    assert_eq!(failed.error.as_deref(), Some("boom"));
}

#[test]
fn run_report_counts_successes_and_failures() {
    let results = vec![
        DeliveryResult::delivered("a@x.com", "1"),
        DeliveryResult::failed("b@x.com", "nope"),
        DeliveryResult::delivered("c@x.com", "2"),
    ];

    let report = RunReport::from_results(10, 3, results);

    assert_eq!(report.total_considered, 10);
    assert_eq!(report.total_due_today, 3);
    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 1);
    assert_eq!(report.successes().count(), 2);
    assert_eq!(
        report.failures().next().map(|r| r.recipient.as_str()),
        Some("b@x.com")
    );
}

#[test]
fn nothing_due_report_is_empty() {
    let report = RunReport::nothing_due(4);
    assert_eq!(report.total_considered, 4);
    assert_eq!(report.total_due_today, 0);
    assert!(report.results.is_empty());
    assert_eq!(report.success_count, 0);
    assert_eq!(report.failure_count, 0);
}

#[test]
fn reminder_message_reports_first_missing_field() {
    let mut message = ReminderMessage {
        recipient: "a@x.com".into(),
        subject: "s".into(),
        body: "b".into(),
        task_id: "1".into(),
        task_title: "T".into(),
    };
    assert_eq!(message.missing_field(), None);

    message.subject = "   ".into();
    assert_eq!(message.missing_field(), Some("subject"));

    message.recipient = String::new();
    assert_eq!(message.missing_field(), Some("recipient"));
}
