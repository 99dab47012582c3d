//! In-memory delivery backend for tests and dry runs.
//!
//! Nothing leaves the process. Successful sends are appended to a
//! [`SentLog`] that callers can inspect, and failures can be forced either
//! unconditionally or at a configurable rate. All randomness (latency,
//! failure rolls, tracking identifiers) comes from an injected [`StdRng`],
//! so a fixed seed gives reproducible runs.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use super::{reject_incomplete, DeliveryBackend, DeliveryFuture};
use crate::models::delivery::DeliveryResult;
use crate::models::reminder::ReminderMessage;

const TRACKING_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TRACKING_SUFFIX_LEN: usize = 9;

/// Artificial delays applied by the simulated backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedTiming {
    /// Delay before `verify_connectivity` answers.
    pub verify_delay: Duration,
    /// Lower bound of the per-send latency.
    pub min_latency: Duration,
    /// Upper bound of the per-send latency.
    pub max_latency: Duration,
    /// Pause between consecutive sends of a batch.
    pub send_interval: Duration,
}

impl Default for SimulatedTiming {
    fn default() -> Self {
        Self {
            verify_delay: Duration::from_millis(500),
            min_latency: Duration::from_millis(500),
            max_latency: Duration::from_millis(1500),
            send_interval: Duration::from_millis(200),
        }
    }
}

impl SimulatedTiming {
    /// No delays at all.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            verify_delay: Duration::ZERO,
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            send_interval: Duration::ZERO,
        }
    }

    /// Fixed per-send latency with no other delays.
    #[must_use]
    pub fn fixed_latency(latency: Duration) -> Self {
        Self {
            min_latency: latency,
            max_latency: latency,
            ..Self::instant()
        }
    }
}

/// A message the simulated backend accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Fabricated tracking identifier.
    pub message_id: String,
    /// Delivery address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Originating task.
    pub task_id: String,
    /// When the send was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Shared handle to the simulated backend's sent log.
///
/// Clones observe the same log.
#[derive(Debug, Clone, Default)]
pub struct SentLog {
    inner: Arc<Mutex<Vec<SentMessage>>>,
}

impl SentLog {
    fn lock(&self) -> MutexGuard<'_, Vec<SentMessage>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, message: SentMessage) {
        self.lock().push(message);
    }

    /// Snapshot of every accepted message, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SentMessage> {
        self.lock().clone()
    }

    /// Number of accepted messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every recorded message.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Summary of the sent log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedStats {
    /// Accepted messages.
    pub total_sent: usize,
    /// Distinct recipients among accepted messages.
    pub unique_recipients: usize,
    /// Timestamp of the most recent accepted message.
    pub last_sent: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
struct FailureMode {
    should_fail: bool,
    failure_rate: f64,
}

/// In-memory [`DeliveryBackend`].
pub struct SimulatedBackend {
    timing: SimulatedTiming,
    failure: Mutex<FailureMode>,
    rng: Mutex<StdRng>,
    sent: SentLog,
}

impl SimulatedBackend {
    /// Backend drawing randomness from `rng`, with default timing and no
    /// forced failures.
    #[must_use]
    pub fn new(rng: StdRng) -> Self {
        Self {
            timing: SimulatedTiming::default(),
            failure: Mutex::new(FailureMode {
                should_fail: false,
                failure_rate: 0.0,
            }),
            rng: Mutex::new(rng),
            sent: SentLog::default(),
        }
    }

    /// Backend with a reproducible random sequence.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Backend seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Replace the artificial delays.
    #[must_use]
    pub fn with_timing(mut self, timing: SimulatedTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Builder form of [`set_failure_mode`](Self::set_failure_mode).
    #[must_use]
    pub fn with_failure_mode(self, should_fail: bool, failure_rate: f64) -> Self {
        self.set_failure_mode(should_fail, failure_rate);
        self
    }

    /// Configure forced failures.
    ///
    /// With `should_fail` every send fails. Otherwise each send fails with
    /// probability `failure_rate`, clamped into `[0, 1)`.
    pub fn set_failure_mode(&self, should_fail: bool, failure_rate: f64) {
        let clamped = if failure_rate.is_finite() {
            failure_rate.clamp(0.0, 1.0 - f64::EPSILON)
        } else {
            0.0
        };
        if clamped.to_bits() != failure_rate.to_bits() {
            warn!(requested = failure_rate, applied = clamped, "failure rate clamped");
        }
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = FailureMode {
            should_fail,
            failure_rate: clamped,
        };
        info!(should_fail, failure_rate = clamped, "simulated failure mode configured");
    }

    /// Shared handle to the sent log.
    #[must_use]
    pub fn sent_log(&self) -> SentLog {
        self.sent.clone()
    }

    /// Snapshot of every accepted message.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.snapshot()
    }

    /// Forget every accepted message.
    pub fn clear_history(&self) {
        self.sent.clear();
        info!("simulated sent log cleared");
    }

    /// Totals over the sent log.
    #[must_use]
    pub fn stats(&self) -> SimulatedStats {
        let sent = self.sent.snapshot();
        let unique_recipients = sent
            .iter()
            .map(|m| m.recipient.as_str())
            .collect::<HashSet<_>>()
            .len();
        SimulatedStats {
            total_sent: sent.len(),
            unique_recipients,
            last_sent: sent.last().map(|m| m.timestamp),
        }
    }

    /// Draw the per-send random values under a single lock.
    fn roll(&self) -> (Duration, f64, String) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let min = duration_millis(self.timing.min_latency);
        let max = duration_millis(self.timing.max_latency).max(min);
        let latency = Duration::from_millis(rng.gen_range(min..=max));

        let failure_roll: f64 = rng.gen();

        let suffix = (0..TRACKING_SUFFIX_LEN)
            .map(|_| char::from(TRACKING_ALPHABET[rng.gen_range(0..TRACKING_ALPHABET.len())]))
            .collect();

        (latency, failure_roll, suffix)
    }
}

impl DeliveryBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn requires_preflight(&self) -> bool {
        false
    }

    fn send_interval(&self) -> Duration {
        self.timing.send_interval
    }

    fn log_stats(&self) {
        let stats = self.stats();
        info!(
            total_sent = stats.total_sent,
            unique_recipients = stats.unique_recipients,
            last_sent = ?stats.last_sent,
            "simulated backend stats"
        );
    }

    fn verify_connectivity(&self) -> DeliveryFuture<'_, bool> {
        Box::pin(async move {
            if !self.timing.verify_delay.is_zero() {
                tokio::time::sleep(self.timing.verify_delay).await;
            }
            info!("simulated connection verified");
            true
        })
    }

    fn send_one<'a>(&'a self, message: &'a ReminderMessage) -> DeliveryFuture<'a, DeliveryResult> {
        Box::pin(async move {
            if let Some(rejected) = reject_incomplete(message) {
                return rejected;
            }

            let (latency, failure_roll, suffix) = self.roll();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let mode = *self.failure.lock().unwrap_or_else(PoisonError::into_inner);
            if mode.should_fail || failure_roll < mode.failure_rate {
                warn!(recipient = %message.recipient, task_id = %message.task_id, "simulated send failed");
                return DeliveryResult::failed(
                    message.recipient.clone(),
                    "simulated delivery failure",
                );
            }

            let now = Utc::now();
            let message_id = format!("sim-{}-{suffix}", now.timestamp_millis());
            self.sent.push(SentMessage {
                message_id: message_id.clone(),
                recipient: message.recipient.clone(),
                subject: message.subject.clone(),
                body: message.body.clone(),
                task_id: message.task_id.clone(),
                timestamp: now,
            });
            info!(
                recipient = %message.recipient,
                subject = %message.subject,
                %message_id,
                "simulated reminder sent"
            );

            DeliveryResult::delivered(message.recipient.clone(), message_id)
        })
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
