//! Due-date filtering.

use chrono::NaiveDate;

use crate::models::task::Task;

/// Tasks whose due date is exactly `reference_date`, in input order.
#[must_use]
pub fn select_due_today(tasks: &[Task], reference_date: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.due_date == reference_date)
        .cloned()
        .collect()
}
