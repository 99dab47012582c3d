//! Task records consumed from the external task store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Urgency level attached to a task.
///
/// The store historically writes Portuguese spellings (`alta`, `media`,
/// `baixa`); both those and the English names are recognized. Anything else
/// is preserved verbatim as [`Priority::Unrecognized`] instead of failing
/// the whole load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    /// Low urgency.
    Low,
    /// Medium urgency.
    Medium,
    /// High urgency.
    High,
    /// Value the store sent that maps to no known level.
    Unrecognized(String),
}

impl Priority {
    /// Canonical lowercase name, or the raw value for unrecognized levels.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl From<String> for Priority {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" | "baixa" => Self::Low,
            "medium" | "media" | "média" => Self::Medium,
            "high" | "alta" => Self::High,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<&str> for Priority {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_owned())
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Unrecognized(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

/// A single task as persisted by the task store.
///
/// The pipeline only ever reads tasks; nothing here is written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque identifier assigned by the store.
    pub id: String,
    /// Short task title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Calendar date the task is due (no time component).
    pub due_date: NaiveDate,
    /// Address the reminder is delivered to.
    #[serde(alias = "email")]
    pub recipient: String,
    /// Urgency level.
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    /// Construct a task with no description.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        due_date: NaiveDate,
        recipient: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            due_date,
            recipient: recipient.into(),
            priority,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
