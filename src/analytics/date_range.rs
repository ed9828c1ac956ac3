use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::DateWindow;

/// Dashboard range presets. Rolling windows end on (and include) the anchor day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePreset {
    Today,
    Week,
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    Year,
    All,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl RangePreset {
    /// Parse a dashboard range string. Missing or unknown values mean `All`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_lowercase()).as_deref() {
            Some("today") => RangePreset::Today,
            Some("week") => RangePreset::Week,
            Some("month") => RangePreset::Month,
            Some("3months") => RangePreset::ThreeMonths,
            Some("6months") => RangePreset::SixMonths,
            Some("year") => RangePreset::Year,
            Some("all") | None => RangePreset::All,
            Some(other) => {
                log::debug!("Unknown date range '{}', using all", other);
                RangePreset::All
            }
        }
    }

    fn rolling_days(&self) -> Option<i64> {
        match self {
            RangePreset::Today => Some(1),
            RangePreset::Week => Some(7),
            RangePreset::Month => Some(30),
            RangePreset::ThreeMonths => Some(90),
            RangePreset::SixMonths => Some(180),
            RangePreset::Year => Some(365),
            RangePreset::All | RangePreset::Custom { .. } => None,
        }
    }
}

/// A preset pinned to the day it is evaluated from, so resolution is
/// deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub preset: RangePreset,
    pub anchor: NaiveDate,
}

impl DateRange {
    pub fn new(preset: RangePreset, anchor: NaiveDate) -> Self {
        Self { preset, anchor }
    }

    pub fn all(anchor: NaiveDate) -> Self {
        Self::new(RangePreset::All, anchor)
    }

    /// Primary window; `None` means unbounded.
    pub fn window(&self) -> Option<DateWindow> {
        if let RangePreset::Custom { start, end } = self.preset {
            return Some(DateWindow::new(start, end));
        }

        self.preset.rolling_days().map(|days| {
            DateWindow::new(self.anchor - Duration::days(days - 1), self.anchor)
        })
    }

    /// The window of equal length immediately before the primary one.
    pub fn comparison_window(&self) -> Option<DateWindow> {
        self.window().map(|w| w.preceding())
    }
}
