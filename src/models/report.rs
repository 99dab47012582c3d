//! Summary returned by a pipeline run.

use serde::{Deserialize, Serialize};

use super::delivery::DeliveryResult;

/// Aggregated outcome of one pipeline run. Built fresh per run and never
/// persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunReport {
    /// Number of tasks loaded from the source.
    pub total_considered: usize,
    /// Number of tasks due on the reference date.
    pub total_due_today: usize,
    /// One result per attempted reminder, in dispatch order.
    pub results: Vec<DeliveryResult>,
    /// Results with `success == true`.
    pub success_count: usize,
    /// Results with `success == false`.
    pub failure_count: usize,
}

impl RunReport {
    /// Report for a run where nothing was due.
    #[must_use]
    pub fn nothing_due(total_considered: usize) -> Self {
        Self {
            total_considered,
            ..Self::default()
        }
    }

    /// Build a report from dispatched results, counting successes and failures.
    #[must_use]
    pub fn from_results(
        total_considered: usize,
        total_due_today: usize,
        results: Vec<DeliveryResult>,
    ) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        let failure_count = results.len() - success_count;
        Self {
            total_considered,
            total_due_today,
            results,
            success_count,
            failure_count,
        }
    }

    /// Successful results only.
    pub fn successes(&self) -> impl Iterator<Item = &DeliveryResult> {
        self.results.iter().filter(|r| r.success)
    }

    /// Failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &DeliveryResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
