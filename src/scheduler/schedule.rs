//! Recurrence rules: a fixed daily time or a five-field cron expression.
//!
//! All times are naive local wall-clock times with minute precision. The
//! cron dialect is the classic one:
//!
//! ```text
//! ┌ minute (0-59)
//! │ ┌ hour (0-23)
//! │ │ ┌ day of month (1-31)
//! │ │ │ ┌ month (1-12 or jan-dec)
//! │ │ │ │ ┌ day of week (0-7 or sun-sat, 0 and 7 are Sunday)
//! * * * * *
//! ```
//!
//! Each field accepts `*`, single values, `a-b` ranges, comma lists, and
//! `/n` steps on `*`, ranges, or a start value. When both day fields are
//! restricted a day matches if either one does.

use std::fmt::{Display, Formatter};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::{AppError, Result};

/// Longest gap searched for the next firing. Covers leap-day schedules
/// across a skipped century leap year.
const MAX_LOOKAHEAD_DAYS: u32 = 366 * 9;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Parsed five-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    day_of_month_restricted: bool,
    day_of_week_restricted: bool,
}

impl CronExpression {
    /// Parse an expression such as `"0 9 * * 1-5"`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Schedule` naming the offending field if the
    /// expression does not have exactly five fields or a field is invalid.
    pub fn parse(expression: &str) -> Result<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
            return Err(AppError::Schedule(format!(
                "expected 5 fields in cron expression `{expression}`, found {}",
                fields.len()
            )));
        };

        let mut days_of_week = parse_field(day_of_week, "day-of-week", 0, 7, &WEEKDAY_NAMES, 0)?;
        // Sunday may be written as 7.
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week & !(1 << 7)) | 1;
        }

        Ok(Self {
            source: fields.join(" "),
            minutes: parse_field(minute, "minute", 0, 59, &[], 0)?,
            hours: parse_field(hour, "hour", 0, 23, &[], 0)?,
            days_of_month: parse_field(day_of_month, "day-of-month", 1, 31, &[], 0)?,
            months: parse_field(month, "month", 1, 12, &MONTH_NAMES, 1)?,
            days_of_week,
            day_of_month_restricted: !day_of_month.starts_with('*'),
            day_of_week_restricted: !day_of_week.starts_with('*'),
        })
    }

    /// Normalized source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the expression fires at `at` (seconds are ignored).
    #[must_use]
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        self.matches_day(at.date())
            && has(self.hours, at.hour())
            && has(self.minutes, at.minute())
    }

    /// First firing strictly after `after`.
    ///
    /// Returns `None` if nothing matches within the lookahead window, which
    /// only happens for impossible dates such as `0 0 31 2 *`.
    #[must_use]
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let start = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let mut date = start.date();

        for _ in 0..=MAX_LOOKAHEAD_DAYS {
            if self.matches_day(date) {
                let first_day = date == start.date();
                let first_hour = if first_day { start.hour() } else { 0 };
                for hour in (first_hour..24).filter(|h| has(self.hours, *h)) {
                    let first_minute = if first_day && hour == first_hour {
                        start.minute()
                    } else {
                        0
                    };
                    if let Some(minute) = (first_minute..60).find(|m| has(self.minutes, *m)) {
                        return date.and_hms_opt(hour, minute, 0);
                    }
                }
            }
            date = date.succ_opt()?;
        }
        None
    }

    fn matches_day(&self, date: NaiveDate) -> bool {
        if !has(self.months, date.month()) {
            return false;
        }
        let by_month_day = has(self.days_of_month, date.day());
        let by_weekday = has(self.days_of_week, date.weekday().num_days_from_sunday());
        if self.day_of_month_restricted && self.day_of_week_restricted {
            by_month_day || by_weekday
        } else {
            by_month_day && by_weekday
        }
    }
}

impl Display for CronExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn has(set: u64, value: u32) -> bool {
    value < 64 && set & (1 << value) != 0
}

/// Parse one field into a bit set of allowed values.
///
/// `names` maps symbolic values to `name_base + index`.
fn parse_field(
    field: &str,
    label: &str,
    min: u32,
    max: u32,
    names: &[&str],
    name_base: u32,
) -> Result<u64> {
    let invalid =
        |detail: &str| AppError::Schedule(format!("invalid {label} field `{field}`: {detail}"));
    let value = |token: &str| -> Result<u32> {
        let lowered = token.to_ascii_lowercase();
        let parsed = match names.iter().position(|name| *name == lowered) {
            Some(index) => {
                u32::try_from(index).map_err(|_| invalid("name out of range"))? + name_base
            }
            None => token
                .parse::<u32>()
                .map_err(|_| invalid(&format!("`{token}` is not a number")))?,
        };
        if parsed < min || parsed > max {
            return Err(invalid(&format!("{parsed} is outside {min}-{max}")));
        }
        Ok(parsed)
    };

    let mut set = 0_u64;
    for part in field.split(',') {
        if part.is_empty() {
            return Err(invalid("empty list element"));
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step = step
                    .parse::<u32>()
                    .map_err(|_| invalid(&format!("step `{step}` is not a number")))?;
                if step == 0 {
                    return Err(invalid("step must be greater than zero"));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (low, high) = if range == "*" {
            (min, max)
        } else if let Some((low, high)) = range.split_once('-') {
            (value(low)?, value(high)?)
        } else {
            let start = value(range)?;
            // `a/n` means every n starting at a.
            (start, if step.is_some() { max } else { start })
        };
        if low > high {
            return Err(invalid(&format!("range {low}-{high} is reversed")));
        }

        let step = step.unwrap_or(1) as usize;
        for v in (low..=high).step_by(step) {
            set |= 1 << v;
        }
    }
    Ok(set)
}

/// When a recurring trigger fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Once a day at a fixed local time.
    Daily {
        /// Hour of day (0-23).
        hour: u32,
        /// Minute of hour (0-59).
        minute: u32,
    },
    /// Whenever a cron expression matches.
    Cron(CronExpression),
}

impl Schedule {
    /// Daily schedule at `hour:minute`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Schedule` if the time is not a valid wall-clock
    /// time.
    pub fn daily(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(AppError::Schedule(format!(
                "invalid daily time {hour:02}:{minute:02}"
            )));
        }
        Ok(Self::Daily { hour, minute })
    }

    /// The stock 09:00 daily run.
    #[must_use]
    pub fn default_daily() -> Self {
        Self::Daily { hour: 9, minute: 0 }
    }

    /// Schedule from a cron expression.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Schedule` if the expression is invalid.
    pub fn cron(expression: &str) -> Result<Self> {
        CronExpression::parse(expression).map(Self::Cron)
    }

    /// First firing strictly after `after`.
    #[must_use]
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Daily { hour, minute } => {
                let today = after.date().and_hms_opt(*hour, *minute, 0)?;
                if today > after {
                    Some(today)
                } else {
                    after.date().succ_opt()?.and_hms_opt(*hour, *minute, 0)
                }
            }
            Self::Cron(expression) => expression.next_after(after),
        }
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily { hour, minute } => write!(f, "daily at {hour:02}:{minute:02}"),
            Self::Cron(expression) => write!(f, "cron `{expression}`"),
        }
    }
}
