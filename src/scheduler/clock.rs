//! Wall-clock source for recurring triggers.
//!
//! Schedules are expressed in naive local time, but a trigger has to sleep
//! for a real duration. Converting between the two goes through the time
//! zone so that a DST change between now and the next firing does not shift
//! the firing by an hour.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Source of local wall-clock time for a trigger loop.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Real time left until the local wall-clock time `at`.
    ///
    /// `None` if `at` never occurs locally (skipped by a DST jump).
    fn until(&self, at: NaiveDateTime) -> Option<Duration>;
}

/// The host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn until(&self, at: NaiveDateTime) -> Option<Duration> {
        wait_until(at, &Local::now())
    }
}

/// Real time from `now` until the wall-clock time `at` in `now`'s zone.
///
/// A time repeated by a fall-back resolves to its first occurrence. Returns
/// `None` for a time skipped by a spring-forward and [`Duration::ZERO`] for
/// a time already past.
#[must_use]
pub fn wait_until<Tz: TimeZone>(at: NaiveDateTime, now: &DateTime<Tz>) -> Option<Duration> {
    let target = now.timezone().from_local_datetime(&at).earliest()?;
    Some(
        target
            .signed_duration_since(now.clone())
            .to_std()
            .unwrap_or(Duration::ZERO),
    )
}
