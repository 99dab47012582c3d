//! Recurring and on-demand pipeline triggers with single-flight execution.
//!
//! Every firing (scheduled or manual) must take the [`RunGate`] before the
//! pipeline starts. A firing that finds the gate taken is skipped and
//! logged, never queued. Scheduled firings are spawned as their own tasks
//! so a slow run cannot delay the trigger loop; the gate is what keeps
//! them from overlapping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::clock::{Clock, LocalClock};
use super::gate::RunGate;
use super::schedule::{CronExpression, Schedule};
use crate::models::report::RunReport;
use crate::pipeline::ReminderPipeline;
use crate::Result;

/// What happened to a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The pipeline ran to completion.
    Completed(RunReport),
    /// Another run held the gate; nothing was done.
    Skipped,
}

/// Drives a [`ReminderPipeline`] on a schedule or on demand.
pub struct RunScheduler {
    pipeline: Arc<ReminderPipeline>,
    gate: RunGate,
    clock: Arc<dyn Clock>,
    daily: Schedule,
    runs_started: AtomicU64,
    runs_skipped: AtomicU64,
}

impl RunScheduler {
    /// Scheduler whose daily trigger fires at 09:00 local time.
    #[must_use]
    pub fn new(pipeline: Arc<ReminderPipeline>) -> Self {
        Self {
            pipeline,
            gate: RunGate::new(),
            clock: Arc::new(LocalClock),
            daily: Schedule::default_daily(),
            runs_started: AtomicU64::new(0),
            runs_skipped: AtomicU64::new(0),
        }
    }

    /// Move the daily trigger to `hour:minute`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Schedule` for an invalid wall-clock time.
    pub fn with_daily_time(mut self, hour: u32, minute: u32) -> Result<Self> {
        self.daily = Schedule::daily(hour, minute)?;
        Ok(self)
    }

    /// Replace the wall clock that decides "today" and when triggers fire.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Gate shared by every trigger of this scheduler.
    #[must_use]
    pub fn gate(&self) -> &RunGate {
        &self.gate
    }

    /// Whether a run is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    /// Runs that acquired the gate.
    #[must_use]
    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::SeqCst)
    }

    /// Triggers skipped because a run was in progress.
    #[must_use]
    pub fn runs_skipped(&self) -> u64 {
        self.runs_skipped.load(Ordering::SeqCst)
    }

    /// Run immediately for today's date unless a run is in progress.
    ///
    /// # Errors
    ///
    /// Propagates fatal pipeline errors (`Load`, `Connectivity`).
    pub async fn run_once(&self) -> Result<RunOutcome> {
        self.guarded_run(self.clock.now().date()).await
    }

    /// Run immediately as if `reference_date` were today.
    ///
    /// # Errors
    ///
    /// Propagates fatal pipeline errors (`Load`, `Connectivity`).
    pub async fn run_once_for(&self, reference_date: NaiveDate) -> Result<RunOutcome> {
        self.guarded_run(reference_date).await
    }

    async fn guarded_run(&self, reference_date: NaiveDate) -> Result<RunOutcome> {
        let Some(_permit) = self.gate.try_acquire() else {
            self.runs_skipped.fetch_add(1, Ordering::SeqCst);
            warn!("previous reminder run still in progress; skipping");
            return Ok(RunOutcome::Skipped);
        };
        self.runs_started.fetch_add(1, Ordering::SeqCst);

        let report = self.pipeline.run_with_fixed_date(reference_date).await?;
        Ok(RunOutcome::Completed(report))
    }

    /// One scheduled firing. Errors are logged and swallowed so the trigger
    /// stays armed.
    pub async fn fire(&self) {
        let now = self.clock.now();
        info!(started_at = %now.format("%Y-%m-%d %H:%M:%S"), "scheduled reminder run starting");
        match self.guarded_run(now.date()).await {
            Ok(RunOutcome::Completed(report)) => info!(
                due = report.total_due_today,
                succeeded = report.success_count,
                failed = report.failure_count,
                "scheduled reminder run completed"
            ),
            Ok(RunOutcome::Skipped) => {}
            Err(err) => error!(%err, "scheduled reminder run failed"),
        }
    }

    /// Arm the daily trigger.
    #[must_use]
    pub fn schedule_daily(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        self.schedule(self.daily.clone(), cancel)
    }

    /// Arm a trigger for a caller-supplied cron expression.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Schedule` if the expression is invalid; nothing is
    /// armed in that case.
    pub fn schedule_custom(
        self: &Arc<Self>,
        expression: &str,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        let expression = CronExpression::parse(expression)?;
        Ok(self.schedule(Schedule::Cron(expression), cancel))
    }

    /// Arm a trigger for `schedule`. The loop ends when `cancel` fires; a
    /// run already in flight is left to finish. Firing times that do not
    /// exist in the local zone are skipped.
    ///
    /// Arming more than one trigger per scheduler is not checked.
    #[must_use]
    pub fn schedule(self: &Arc<Self>, schedule: Schedule, cancel: CancellationToken) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let clock = Arc::clone(&self.clock);
        info!(%schedule, "reminder trigger armed");
        let span = info_span!("reminder_trigger", %schedule);

        tokio::spawn(
            async move {
                let mut last_fired: Option<NaiveDateTime> = None;
                loop {
                    let now = clock.now();
                    let from = last_fired.map_or(now, |last| last.max(now));
                    let Some(next) = schedule.next_after(from) else {
                        error!("schedule has no upcoming firing; trigger stopped");
                        break;
                    };
                    let Some(delay) = clock.until(next) else {
                        warn!(%next, "firing time does not exist in local time; skipped");
                        last_fired = Some(next);
                        continue;
                    };
                    debug!(%next, ?delay, "next reminder run");

                    tokio::select! {
                        () = cancel.cancelled() => {
                            info!("reminder trigger shutting down");
                            break;
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                    last_fired = Some(next);

                    let firing = Arc::clone(&scheduler);
                    tokio::spawn(
                        async move { firing.fire().await }.instrument(info_span!("scheduled_run")),
                    );
                }
            }
            .instrument(span),
        )
    }
}
