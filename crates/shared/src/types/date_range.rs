//! Inclusive date ranges for fiscal periods and queries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a range would end before it starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid date range: {start} is after {end}")]
pub struct DateRangeError {
    /// Requested start date.
    pub start: NaiveDate,
    /// Requested end date.
    pub end: NaiveDate,
}

/// A closed interval of calendar dates, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included.
    pub start: NaiveDate,
    /// Last day included.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns true if `date` falls inside the range (bounds included).
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Two ranges overlap if `a.start <= b.end && a.end >= b.start`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Returns true if `other` starts on the day after this range ends.
    #[must_use]
    pub fn is_followed_by(&self, other: &Self) -> bool {
        self.end.succ_opt() == Some(other.start)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
