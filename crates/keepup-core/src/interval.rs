//! Daily suspension windows.
//!
//! An [`Interval`] is a time-of-day window repeated every day. When `end`
//! lies before `start` the window spans midnight. Containment is
//! start-inclusive and end-exclusive.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeOfDayError {
    #[error("expected HH:MM, got {0:?}")]
    Format(String),

    #[error("time of day out of range: {hour:02}:{minute:02}")]
    OutOfRange { hour: u32, minute: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, TimeOfDayError> {
        if hour > 23 || minute > 59 {
            return Err(TimeOfDayError::OutOfRange { hour, minute });
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    pub fn hour(&self) -> u32 {
        u32::from(self.hour)
    }

    pub fn minute(&self) -> u32 {
        u32::from(self.minute)
    }

    pub fn seconds_of_day(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60
    }

    pub fn as_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeOfDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| TimeOfDayError::Format(s.to_string()))?;
        let hour = hour
            .parse()
            .map_err(|_| TimeOfDayError::Format(s.to_string()))?;
        let minute = minute
            .parse()
            .map_err(|_| TimeOfDayError::Format(s.to_string()))?;
        TimeOfDay::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeOfDayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    #[serde(default)]
    pub id: i64,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Interval {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { id: 0, start, end }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let t = i64::from(time.num_seconds_from_midnight());
        let start = self.start.seconds_of_day();
        let end = self.end.seconds_of_day();
        if self.wraps_midnight() {
            t >= start || t < end
        } else {
            t >= start && t < end
        }
    }

    /// Seconds from `time` until this interval next starts, strictly after `time`.
    fn seconds_until_start(&self, time: NaiveTime) -> i64 {
        let t = i64::from(time.num_seconds_from_midnight());
        let delta = self.start.seconds_of_day() - t;
        if delta > 0 { delta } else { delta + SECONDS_PER_DAY }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

pub fn find_current(intervals: &[Interval], time: NaiveTime) -> Option<&Interval> {
    intervals.iter().find(|interval| interval.contains(time))
}

/// The interval starting soonest after `time`, wrapping to the next day.
pub fn find_next(intervals: &[Interval], time: NaiveTime) -> Option<&Interval> {
    intervals
        .iter()
        .min_by_key(|interval| interval.seconds_until_start(time))
}

/// First instant at `time_of_day` (in `offset`) lying strictly after `not_before`.
pub fn next_occurrence(
    time_of_day: TimeOfDay,
    not_before: DateTime<Utc>,
    offset: FixedOffset,
) -> DateTime<Utc> {
    let local = not_before.with_timezone(&offset);
    let today = local.date_naive().and_time(time_of_day.as_naive());
    let candidate = match offset.from_local_datetime(&today).single() {
        Some(candidate) => candidate,
        None => return not_before + TimeDelta::days(1),
    };
    if candidate > local {
        candidate.with_timezone(&Utc)
    } else {
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
        offset
            .from_local_datetime(&tomorrow)
            .single()
            .map(|instant| instant.with_timezone(&Utc))
            .unwrap_or(not_before + TimeDelta::days(1))
    }
}
