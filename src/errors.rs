//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all fatal failure modes.
///
/// Per-message delivery failures are not errors: they are reported as
/// failed [`DeliveryResult`](crate::models::delivery::DeliveryResult)s.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Task collection missing, unreadable, or malformed.
    Load(String),
    /// Live delivery backend failed its readiness handshake.
    Connectivity(String),
    /// Recurrence expression or trigger registration failure.
    Schedule(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Load(msg) => write!(f, "load: {msg}"),
            Self::Connectivity(msg) => write!(f, "connectivity: {msg}"),
            Self::Schedule(msg) => write!(f, "schedule: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
