#![forbid(unsafe_code)]

//! Scheduled due-date reminders for a task list.
//!
//! A [`ReminderPipeline`] loads tasks from a [`source::TaskSource`], picks the
//! ones due on the reference date, composes a reminder for each, and hands
//! them to a [`delivery::DeliveryBackend`]. A [`RunScheduler`] fires the
//! pipeline on a daily time or cron expression and never lets two runs
//! overlap.

pub mod composer;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod selector;
pub mod source;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
pub use pipeline::ReminderPipeline;
pub use scheduler::{RunOutcome, RunScheduler};
