//! ISO week tokens and the half-open time ranges they select.
//!
//! A report week is named by an ISO year-week token (`2024-W10`) and covers
//! `[Monday 00:00, next Monday 00:00)` in the report's UTC offset. The
//! platform's query bound is derived the same way the dashboard always has:
//! take the last day of the week (Sunday) and advance it by one day, which
//! lands on the following Monday.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, FixedOffset, NaiveDate, TimeZone, Weekday};
use serde::{Serialize, Serializer};

use crate::error::CoreError;
use crate::types::{EpochSecs, Timestamp};

/// Days from a week's Monday to its Sunday.
const DAYS_TO_WEEK_END: u64 = 6;

// ---------------------------------------------------------------------------
// IsoWeek
// ---------------------------------------------------------------------------

/// A validated ISO year-week, e.g. `2024-W10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsoWeek {
    year: i32,
    week: u32,
}

impl IsoWeek {
    /// Build from parts, rejecting weeks that do not exist in `year`.
    pub fn new(year: i32, week: u32) -> Result<Self, CoreError> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .map(|_| Self { year, week })
            .ok_or_else(|| {
                CoreError::Validation(format!("ISO week {week} does not exist in {year}"))
            })
    }

    /// The ISO week a calendar date falls in.
    pub fn containing(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// The ISO week containing `now`, as seen from `offset`.
    pub fn current(now: Timestamp, offset: FixedOffset) -> Self {
        Self::containing(now.with_timezone(&offset).date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// Monday of this week.
    pub fn monday(&self) -> NaiveDate {
        // Validated at construction.
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or(NaiveDate::MIN)
    }

    pub fn previous(&self) -> Self {
        Self::containing(self.monday() - Days::new(7))
    }

    pub fn next(&self) -> Self {
        Self::containing(self.monday() + Days::new(7))
    }

    /// `count` consecutive weeks ending with (and including) `self`,
    /// oldest first.
    pub fn trailing(&self, count: usize) -> Vec<Self> {
        let mut weeks = Vec::with_capacity(count);
        let mut week = *self;
        for _ in 0..count {
            weeks.push(week);
            week = week.previous();
        }
        weeks.reverse();
        weeks
    }

    /// The half-open epoch range covered by this week in `offset`.
    pub fn range(&self, offset: FixedOffset) -> WeekRange {
        let start_date = self.monday();
        let end_date = start_date + Days::new(DAYS_TO_WEEK_END);
        let end_bound = end_date + Days::new(1);
        WeekRange {
            start_time: midnight(start_date, offset),
            end_time: midnight(end_bound, offset),
        }
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

impl FromStr for IsoWeek {
    type Err = CoreError;

    /// Parse `YYYY-Www` (the `W` may be lowercase).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            CoreError::Validation(format!(
                "Invalid ISO week '{s}'. Expected the form YYYY-Www, e.g. 2024-W10"
            ))
        };

        let (year, week) = s
            .trim()
            .split_once("-W")
            .or_else(|| s.trim().split_once("-w"))
            .ok_or_else(invalid)?;

        if year.len() != 4 || week.is_empty() || week.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;

        Self::new(year, week)
    }
}

impl Serialize for IsoWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// WeekRange
// ---------------------------------------------------------------------------

/// A half-open interval `[start_time, end_time)` in epoch seconds.
///
/// This is also the event cache key: two requests for the same week resolve
/// to the same range regardless of their filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WeekRange {
    pub start_time: EpochSecs,
    pub end_time: EpochSecs,
}

impl WeekRange {
    pub fn new(start_time: EpochSecs, end_time: EpochSecs) -> Result<Self, CoreError> {
        if end_time <= start_time {
            return Err(CoreError::Validation(format!(
                "Range end {end_time} must be after start {start_time}"
            )));
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    pub fn contains(&self, at: EpochSecs) -> bool {
        self.start_time <= at && at < self.end_time
    }

    pub fn duration_secs(&self) -> i64 {
        self.end_time - self.start_time
    }
}

fn midnight(date: NaiveDate, offset: FixedOffset) -> EpochSecs {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
        // A fixed offset never produces an ambiguous local time.
        .unwrap_or_else(|| naive.and_utc().timestamp() - i64::from(offset.local_minus_utc()))
}
