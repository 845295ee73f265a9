// Daily reset time-of-day

use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use std::fmt;
use std::str::FromStr;

/// A wall-clock time at which the reset fires every day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Local midnight
    pub fn midnight() -> Self {
        Self {
            at: NaiveTime::MIN,
        }
    }

    pub fn time(&self) -> NaiveTime {
        self.at
    }

    /// First firing strictly after `now`, in `now`'s timezone
    ///
    /// On a DST gap the day is skipped; on a DST overlap the earlier instant wins.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = now.timezone();
        let today = now.date_naive();

        (0..=2).find_map(|offset| {
            let day = today + Duration::days(offset);
            let candidate = tz.from_local_datetime(&day.and_time(self.at)).earliest()?;
            (candidate > *now).then_some(candidate)
        })
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self::midnight()
    }
}

impl FromStr for DailySchedule {
    type Err = AppError;

    /// Parses `HH:MM` (24h)
    fn from_str(s: &str) -> Result<Self> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self::new)
            .map_err(|e| AppError::Config(format!("invalid reset time '{}': {}", s, e)))
    }
}

impl fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.at.format("%H:%M"))
    }
}
