//! JSON file task source.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tracing::{debug, info};

use super::TaskSource;
use crate::models::task::Task;
use crate::{AppError, Result};

/// Reads a JSON array of tasks from disk on every load.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Source backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse a task collection from raw JSON text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Load` if the text is not a JSON array of tasks.
    pub fn parse(raw: &str) -> Result<Vec<Task>> {
        serde_json::from_str(raw).map_err(|err| AppError::Load(format!("malformed tasks: {err}")))
    }
}

impl TaskSource for JsonFileSource {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Task>>> + Send + '_>> {
        Box::pin(async move {
            debug!(path = %self.path.display(), "loading tasks");
            let raw = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
                AppError::Load(format!("cannot read {}: {err}", self.path.display()))
            })?;
            let tasks = Self::parse(&raw)?;
            info!(count = tasks.len(), "tasks loaded");
            Ok(tasks)
        })
    }
}
