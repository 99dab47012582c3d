//! Run triggering: schedules, the wall clock, the single-flight gate, and
//! the runner.

pub mod clock;
pub mod gate;
pub mod runner;
pub mod schedule;

pub use clock::{Clock, LocalClock};
pub use gate::{RunGate, RunPermit};
pub use runner::{RunOutcome, RunScheduler};
pub use schedule::{CronExpression, Schedule};
