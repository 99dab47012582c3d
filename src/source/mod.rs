//! Task collection sources.
//!
//! The task store itself lives outside this crate; a [`TaskSource`] only
//! knows how to hand the pipeline the full collection, loaded wholesale on
//! every run.

pub mod json_file;

use std::future::Future;
use std::pin::Pin;

use crate::models::task::Task;
use crate::Result;

pub use json_file::JsonFileSource;

/// Supplier of the complete task collection.
pub trait TaskSource: Send + Sync {
    /// Load every task.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Load`](crate::AppError::Load) if the collection is
    /// missing, unreadable, or malformed.
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Task>>> + Send + '_>>;
}

/// Fixed in-memory task collection.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tasks: Vec<Task>,
}

impl StaticSource {
    /// Wrap an existing collection.
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }
}

impl TaskSource for StaticSource {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Task>>> + Send + '_>> {
        Box::pin(async move { Ok(self.tasks.clone()) })
    }
}
