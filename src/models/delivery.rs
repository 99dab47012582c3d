//! Per-message delivery outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one delivery attempt.
///
/// `message_id` is present iff the attempt succeeded and `error` is present
/// iff it failed; use [`delivered`](Self::delivered) and
/// [`failed`](Self::failed) to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeliveryResult {
    /// Address the attempt targeted.
    pub recipient: String,
    /// Whether the backend accepted the message.
    pub success: bool,
    /// Backend tracking identifier for accepted messages.
    pub message_id: Option<String>,
    /// Human-readable failure description.
    pub error: Option<String>,
    /// When the attempt finished.
    pub timestamp: DateTime<Utc>,
}

impl DeliveryResult {
    /// Successful delivery with the backend's tracking identifier.
    #[must_use]
    pub fn delivered(recipient: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            success: true,
            message_id: Some(message_id.into()),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed delivery with a description of what went wrong.
    #[must_use]
    pub fn failed(recipient: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            success: false,
            message_id: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}
