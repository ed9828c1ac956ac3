use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Wire format of every date key (note identity, calendar days).
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a canonical `YYYY-MM-DD` key. Non-canonical spellings such as `2024-1-5`
/// are rejected so the write and read paths can never disagree on identity.
pub fn parse_date_key(raw: &str) -> Result<NaiveDate, CoreError> {
    let date = NaiveDate::parse_from_str(raw, DATE_KEY_FORMAT)
        .map_err(|_| CoreError::InvalidDateKey(raw.to_string()))?;

    if format_date_key(date) != raw {
        return Err(CoreError::InvalidDateKey(raw.to_string()));
    }

    Ok(date)
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Build a window, swapping the bounds if they arrive reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, bounds included.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The window of equal length ending the day before this one starts.
    pub fn preceding(&self) -> Self {
        let end = self.start - Duration::days(1);
        let start = end - Duration::days(self.len_days() - 1);
        Self { start, end }
    }
}
