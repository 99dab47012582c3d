//! Outgoing reminder message.

use serde::{Deserialize, Serialize};

/// Notification content derived from one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReminderMessage {
    /// Delivery address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Identifier of the task this reminder was built from.
    pub task_id: String,
    /// Title of the task this reminder was built from.
    pub task_title: String,
}

impl ReminderMessage {
    /// Name of the first required field that is empty, if any.
    ///
    /// Whitespace-only values count as empty.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("recipient", &self.recipient),
            ("subject", &self.subject),
            ("body", &self.body),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}
