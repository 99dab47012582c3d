//! Replaceable reminder delivery backends.
//!
//! The [`DeliveryBackend`] trait decouples the pipeline from the transport
//! that actually carries reminders. Two implementations ship with the
//! crate:
//!
//! - [`live::LiveMailBackend`] posts to an HTTP mail relay.
//! - [`simulated::SimulatedBackend`] keeps everything in memory, with
//!   injectable failures and a retained sent log.
//!
//! Individual sends never return errors. Every failure path is folded into
//! a failed [`DeliveryResult`] so a batch always runs to the end.

pub mod live;
pub mod simulated;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{BackendKind, GlobalConfig};
use crate::models::delivery::DeliveryResult;
use crate::models::reminder::ReminderMessage;
use crate::{AppError, Result};

pub use live::{LiveMailBackend, SenderCredentials};
pub use simulated::{SentLog, SentMessage, SimulatedBackend, SimulatedStats, SimulatedTiming};

/// Boxed future returned by backend operations.
pub type DeliveryFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transport-agnostic reminder delivery capability.
pub trait DeliveryBackend: Send + Sync {
    /// Short backend name used in log fields.
    fn name(&self) -> &'static str;

    /// Whether the pipeline must pass [`verify_connectivity`](Self::verify_connectivity)
    /// before dispatching. Backends that are always ready answer `false`.
    fn requires_preflight(&self) -> bool {
        true
    }

    /// Pause inserted between consecutive sends of a batch.
    fn send_interval(&self) -> Duration;

    /// Emit backend-specific totals at the end of a run.
    fn log_stats(&self) {}

    /// Check that the backend can accept messages.
    ///
    /// A failed handshake yields `false`; it is up to the caller to decide
    /// whether that is fatal.
    fn verify_connectivity(&self) -> DeliveryFuture<'_, bool>;

    /// Attempt one delivery.
    ///
    /// Messages with an empty recipient, subject, or body are rejected with
    /// a failed result before any transport work happens.
    fn send_one<'a>(&'a self, message: &'a ReminderMessage) -> DeliveryFuture<'a, DeliveryResult>;

    /// Deliver every message in order, one at a time, pausing
    /// [`send_interval`](Self::send_interval) between sends.
    ///
    /// A failed item never stops the batch. Results line up with the input.
    fn send_bulk<'a>(
        &'a self,
        messages: &'a [ReminderMessage],
    ) -> DeliveryFuture<'a, Vec<DeliveryResult>> {
        Box::pin(async move {
            if messages.is_empty() {
                return Vec::new();
            }
            info!(backend = self.name(), count = messages.len(), "starting bulk send");

            let interval = self.send_interval();
            let mut results = Vec::with_capacity(messages.len());
            for (index, message) in messages.iter().enumerate() {
                if index > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                results.push(self.send_one(message).await);
            }

            let delivered = results.iter().filter(|r| r.success).count();
            info!(
                backend = self.name(),
                delivered,
                failed = results.len() - delivered,
                "bulk send finished"
            );
            results
        })
    }
}

/// Reject messages missing a required field.
///
/// Returns the failed result to report, or `None` if the message is
/// complete.
#[must_use]
pub fn reject_incomplete(message: &ReminderMessage) -> Option<DeliveryResult> {
    let field = message.missing_field()?;
    warn!(
        recipient = %message.recipient,
        task_id = %message.task_id,
        field,
        "reminder rejected before send"
    );
    Some(DeliveryResult::failed(
        message.recipient.clone(),
        format!("missing required field: {field}"),
    ))
}

/// Build the backend selected by `config`.
///
/// # Errors
///
/// Returns `AppError::Config` if the live backend is selected without an
/// endpoint or loaded sender credentials, or its HTTP client cannot be
/// built.
pub fn from_config(config: &GlobalConfig) -> Result<Arc<dyn DeliveryBackend>> {
    config.validate_backend()?;
    match config.backend {
        BackendKind::Live => {
            let credentials = config.credentials.clone().ok_or_else(|| {
                AppError::Config("live backend requires sender credentials".into())
            })?;
            Ok(Arc::new(LiveMailBackend::new(&config.live, credentials)?))
        }
        BackendKind::Simulated => {
            let settings = &config.simulated;
            let backend = match settings.seed {
                Some(seed) => SimulatedBackend::seeded(seed),
                None => SimulatedBackend::from_entropy(),
            };
            let timing = SimulatedTiming {
                send_interval: Duration::from_millis(settings.send_interval_ms),
                ..SimulatedTiming::default()
            };
            info!("simulated backend selected; no reminders will leave this process");
            Ok(Arc::new(
                backend
                    .with_timing(timing)
                    .with_failure_mode(settings.should_fail, settings.failure_rate),
            ))
        }
    }
}
