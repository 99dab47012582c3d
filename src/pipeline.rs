//! Reminder pipeline: load, select, compose, dispatch, report.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{info, info_span, warn, Instrument};

use crate::composer;
use crate::delivery::DeliveryBackend;
use crate::models::reminder::ReminderMessage;
use crate::models::report::RunReport;
use crate::selector::select_due_today;
use crate::source::TaskSource;
use crate::{AppError, Result};

/// Orchestrates one reminder run over an injected source and backend.
pub struct ReminderPipeline {
    source: Arc<dyn TaskSource>,
    backend: Arc<dyn DeliveryBackend>,
}

impl ReminderPipeline {
    /// Build a pipeline over `source` and `backend`.
    #[must_use]
    pub fn new(source: Arc<dyn TaskSource>, backend: Arc<dyn DeliveryBackend>) -> Self {
        Self { source, backend }
    }

    /// Backend reminders are dispatched through.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn DeliveryBackend> {
        &self.backend
    }

    /// Run for today's local date.
    ///
    /// # Errors
    ///
    /// See [`run_with_fixed_date`](Self::run_with_fixed_date).
    pub async fn run(&self) -> Result<RunReport> {
        self.run_with_fixed_date(Local::now().date_naive()).await
    }

    /// Run as if `reference_date` were today. Nothing else changes.
    ///
    /// A run where no task is due is a success with an empty report.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Load` if the task source fails, and
    /// `AppError::Connectivity` if a backend that requires preflight fails
    /// its handshake. In the latter case nothing has been sent.
    pub async fn run_with_fixed_date(&self, reference_date: NaiveDate) -> Result<RunReport> {
        let span = info_span!(
            "reminder_run",
            %reference_date,
            backend = self.backend.name()
        );
        self.execute(reference_date).instrument(span).await
    }

    async fn execute(&self, reference_date: NaiveDate) -> Result<RunReport> {
        info!("starting reminder run");

        let tasks = self.source.load().await?;
        let due = select_due_today(&tasks, reference_date);
        info!(
            total = tasks.len(),
            due = due.len(),
            "selected tasks due on reference date"
        );
        for (position, task) in due.iter().enumerate() {
            info!(
                position = position + 1,
                task_id = %task.id,
                title = %task.title,
                recipient = %task.recipient,
                "task due"
            );
        }

        if due.is_empty() {
            info!("no reminders to send");
            return Ok(RunReport::nothing_due(tasks.len()));
        }

        if self.backend.requires_preflight() && !self.backend.verify_connectivity().await {
            return Err(AppError::Connectivity(format!(
                "{} backend failed its connection check",
                self.backend.name()
            )));
        }

        let messages: Vec<ReminderMessage> = due.iter().map(composer::compose).collect();
        let results = self.backend.send_bulk(&messages).await;
        let report = RunReport::from_results(tasks.len(), due.len(), results);

        log_report(&report);
        self.backend.log_stats();
        Ok(report)
    }
}

fn log_report(report: &RunReport) {
    info!(
        considered = report.total_considered,
        due = report.total_due_today,
        succeeded = report.success_count,
        failed = report.failure_count,
        "reminder run finished"
    );
    for result in report.successes() {
        info!(
            recipient = %result.recipient,
            message_id = result.message_id.as_deref().unwrap_or_default(),
            "delivered"
        );
    }
    for result in report.failures() {
        warn!(
            recipient = %result.recipient,
            error = result.error.as_deref().unwrap_or_default(),
            "not delivered"
        );
    }
}
