//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::delivery::SenderCredentials;
use crate::scheduler::schedule::{CronExpression, Schedule};
use crate::{AppError, Result};

/// OS keychain service holding the sender credentials.
pub const KEYRING_SERVICE: &str = "task-reminder";

/// Environment variable fallback for the sender address.
pub const SENDER_ADDRESS_ENV: &str = "EMAIL_USER";

/// Environment variable fallback for the sender secret.
pub const SENDER_SECRET_ENV: &str = "EMAIL_PASS";

/// Environment variable that forces the simulated backend when `true`.
pub const USE_MOCK_ENV: &str = "USE_MOCK";

/// Which delivery backend the process runs with.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// HTTP mail relay.
    #[default]
    Live,
    /// In-memory simulation; nothing is sent.
    Simulated,
}

/// Recurring trigger settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScheduleConfig {
    /// Hour of the daily run (local time, 0-23).
    #[serde(default = "default_daily_hour")]
    pub daily_hour: u32,
    /// Minute of the daily run (0-59).
    #[serde(default)]
    pub daily_minute: u32,
    /// Optional cron expression used instead of the daily time.
    #[serde(default)]
    pub cron: Option<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_hour: default_daily_hour(),
            daily_minute: 0,
            cron: None,
        }
    }
}

fn default_daily_hour() -> u32 {
    9
}

/// HTTP mail relay settings for the live backend.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LiveConfig {
    /// Base URL of the relay.
    #[serde(default)]
    pub endpoint: String,
    /// Display name used in the `From` header.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    /// Pause between consecutive sends.
    #[serde(default = "default_live_send_interval_ms")]
    pub send_interval_ms: u64,
    /// Per-request timeout enforced by the HTTP client.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            sender_name: default_sender_name(),
            send_interval_ms: default_live_send_interval_ms(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl LiveConfig {
    /// Pause between consecutive sends.
    #[must_use]
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn default_sender_name() -> String {
    "Task Reminders".into()
}

fn default_live_send_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_seconds() -> u64 {
    30
}

/// Failure injection and pacing for the simulated backend.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SimulatedConfig {
    /// Fail every send.
    #[serde(default)]
    pub should_fail: bool,
    /// Probability in `[0, 1)` that an individual send fails.
    #[serde(default)]
    pub failure_rate: f64,
    /// Pause between consecutive sends.
    #[serde(default = "default_simulated_send_interval_ms")]
    pub send_interval_ms: u64,
    /// Fixed random seed; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            should_fail: false,
            failure_rate: 0.0,
            send_interval_ms: default_simulated_send_interval_ms(),
            seed: None,
        }
    }
}

fn default_simulated_send_interval_ms() -> u64 {
    200
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// JSON file holding the task collection.
    pub tasks_path: PathBuf,
    /// Delivery backend selection.
    #[serde(default)]
    pub backend: BackendKind,
    /// Recurring trigger settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Live backend settings.
    #[serde(default)]
    pub live: LiveConfig,
    /// Simulated backend settings.
    #[serde(default)]
    pub simulated: SimulatedConfig,
    /// Sender credentials for the live backend (populated at runtime).
    #[serde(skip)]
    pub credentials: Option<SenderCredentials>,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// A relative `tasks_path` is resolved against the directory holding
    /// the configuration file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        let mut config = Self::from_toml_str(&raw)?;
        if config.tasks_path.is_relative() {
            if let Some(parent) = path.parent() {
                config.tasks_path = parent.join(&config.tasks_path);
            }
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Switch to the simulated backend when `USE_MOCK=true`.
    pub fn apply_env_overrides(&mut self) {
        let use_mock = env::var(USE_MOCK_ENV)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if use_mock && self.backend != BackendKind::Simulated {
            info!("{USE_MOCK_ENV}=true; using simulated backend");
            self.backend = BackendKind::Simulated;
        }
    }

    /// Load sender credentials when the live backend is selected.
    ///
    /// Tries the `task-reminder` keyring service first, then falls back to
    /// the `EMAIL_USER` / `EMAIL_PASS` environment variables. Does nothing
    /// for the simulated backend.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// the credentials.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if self.backend != BackendKind::Live {
            return Ok(());
        }
        let address = load_credential("sender_address", SENDER_ADDRESS_ENV).await?;
        let secret = load_credential("sender_secret", SENDER_SECRET_ENV).await?;
        self.credentials = Some(SenderCredentials::new(address, secret));
        Ok(())
    }

    /// Recurring schedule described by this configuration: the cron
    /// expression when one is set, otherwise the daily time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Schedule` if the cron expression or daily time is
    /// invalid.
    pub fn recurring_schedule(&self) -> Result<Schedule> {
        match &self.schedule.cron {
            Some(expression) => Ok(Schedule::Cron(CronExpression::parse(expression)?)),
            None => Schedule::daily(self.schedule.daily_hour, self.schedule.daily_minute),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.tasks_path.as_os_str().is_empty() {
            return Err(AppError::Config("tasks_path must not be empty".into()));
        }

        if self.schedule.daily_hour > 23 {
            return Err(AppError::Config(format!(
                "schedule.daily_hour must be 0-23, got {}",
                self.schedule.daily_hour
            )));
        }

        if self.schedule.daily_minute > 59 {
            return Err(AppError::Config(format!(
                "schedule.daily_minute must be 0-59, got {}",
                self.schedule.daily_minute
            )));
        }

        if let Some(expression) = &self.schedule.cron {
            CronExpression::parse(expression)
                .map_err(|err| AppError::Config(format!("schedule.cron invalid: {err}")))?;
        }

        let rate = self.simulated.failure_rate;
        if !(0.0..1.0).contains(&rate) {
            return Err(AppError::Config(format!(
                "simulated.failure_rate must be in [0, 1), got {rate}"
            )));
        }

        Ok(())
    }

    /// Check the settings of the backend that will actually run.
    ///
    /// Call after `--simulate` and `USE_MOCK` have been applied; parsing
    /// alone never requires live relay settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the live backend is selected without
    /// an endpoint.
    pub fn validate_backend(&self) -> Result<()> {
        if self.backend == BackendKind::Live && self.live.endpoint.trim().is_empty() {
            return Err(AppError::Config(
                "live.endpoint is required when backend = \"live\"".into(),
            ));
        }
        Ok(())
    }
}

/// Resolve one sender credential: the OS keychain first, then `env_key`.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    if let Some(value) = keychain_value(keyring_key).await? {
        info!(key = keyring_key, source = "keychain", "sender credential resolved");
        return Ok(value);
    }
    if let Some(value) = env_value(env_key) {
        info!(key = keyring_key, source = env_key, "sender credential resolved");
        return Ok(value);
    }
    Err(AppError::Config(format!(
        "sender credential {keyring_key} missing: no keychain entry under \
         {KEYRING_SERVICE} and {env_key} is unset or blank"
    )))
}

/// Non-blank keychain entry for `key`, if any. Lookup failures are logged
/// and treated as absent.
async fn keychain_value(key: &str) -> Result<Option<String>> {
    let owned = key.to_owned();
    let lookup = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &owned)?.get_password()
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain lookup for {key} aborted: {err}")))?;

    match lookup {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
        Ok(_) => {
            warn!(key, "blank keychain entry ignored");
            Ok(None)
        }
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => {
            warn!(key, %err, "keychain unavailable");
            Ok(None)
        }
    }
}

fn env_value(env_key: &str) -> Option<String> {
    env::var(env_key).ok().filter(|value| !value.trim().is_empty())
}
