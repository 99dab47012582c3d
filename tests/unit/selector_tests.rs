//! Unit tests for due-date selection.

use chrono::NaiveDate;

use task_reminder::models::task::{Priority, Task};
use task_reminder::selector::select_due_today;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn task(id: &str, due: NaiveDate) -> Task {
    Task::new(id, format!("task {id}"), due, "a@x.com", Priority::Low)
}

#[test]
fn selects_only_exact_date_matches_in_input_order() {
    let today = date(2024, 3, 10);
    let tasks = vec![
        task("a", today),
        task("b", date(2024, 3, 9)),
        task("c", today),
        task("d", date(2024, 3, 11)),
        task("e", today),
    ];

    let due = select_due_today(&tasks, today);

    let ids: Vec<&str> = due.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["a", "c", "e"]);
}

#[test]
fn empty_input_yields_empty_output() {
    assert!(select_due_today(&[], date(2024, 3, 10)).is_empty());
}

#[test]
fn nothing_due_yields_empty_output() {
    let tasks = vec![task("a", date(2024, 3, 9))];
    assert!(select_due_today(&tasks, date(2024, 3, 10)).is_empty());
}

#[test]
fn same_year_and_day_in_other_month_is_not_due() {
    let tasks = vec![task("a", date(2024, 4, 10))];
    assert!(select_due_today(&tasks, date(2024, 3, 10)).is_empty());
}

#[test]
fn does_not_mutate_input() {
    let today = date(2024, 3, 10);
    let tasks = vec![task("a", today), task("b", date(2024, 1, 1))];
    let before = tasks.clone();

    let _ = select_due_today(&tasks, today);

    assert_eq!(tasks, before);
}
