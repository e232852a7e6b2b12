//! Minute-granularity times of day and ranges ("08:30-10:30").

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimeRangeError {
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("invalid range '{0}', expected HH:MM-HH:MM")]
    InvalidRange(String),
}

/// Parse `HH:MM` into minutes since midnight.
pub fn parse_time(data: &str) -> Result<u32, TimeRangeError> {
    let invalid = || TimeRangeError::InvalidTime(data.to_string());
    let (hours, minutes) = data.trim().split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

pub fn print_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Half-open range of minutes, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeRange {
    pub start: u32,
    pub end: u32,
}

impl TimeRange {
    pub fn new(start: u32, end: u32) -> Self {
        TimeRange { start, end }
    }

    /// Whether the two ranges share at least one minute. Touching ranges
    /// (`08:00-09:00` and `09:00-10:00`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` starts exactly where this one ends.
    pub fn adjoins(&self, other: &TimeRange) -> bool {
        self.end == other.start
    }
}

impl FromStr for TimeRange {
    type Err = TimeRangeError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let (start, end) = data
            .split_once('-')
            .ok_or_else(|| TimeRangeError::InvalidRange(data.to_string()))?;
        Ok(TimeRange::new(parse_time(start)?, parse_time(end)?))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", print_time(self.start), print_time(self.end))
    }
}
