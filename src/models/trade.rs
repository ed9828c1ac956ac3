use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "LONG", alias = "Long")]
    Long,
    #[serde(alias = "SHORT", alias = "Short")]
    Short,
}

/// Trade as held by the trade store, before the calendar day is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub pnl: f64,
    pub entry_time: i64, // Unix milliseconds
    pub exit_time: Option<i64>,
    #[serde(default)]
    pub strategy: String,
    #[serde(default)]
    pub asset_class: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Immutable, ingested trade. `occurred_at` is resolved once here and is the
/// only date the aggregators ever look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub pnl: f64,
    pub entry_time: i64,
    pub exit_time: Option<i64>,
    pub strategy: String,
    pub asset_class: String,
    pub tags: BTreeSet<String>,
    pub occurred_at: NaiveDate,
}

impl TradeRecord {
    /// Resolve the local calendar day of the trade (exit time when closed,
    /// entry time otherwise) in the caller's time zone.
    pub fn ingest<Tz: TimeZone>(self, tz: &Tz) -> Result<Trade, ApiError> {
        if !self.pnl.is_finite() {
            return Err(ApiError::ParseError(format!(
                "Invalid pnl for trade {}: {}",
                self.id, self.pnl
            )));
        }

        let timestamp = self.exit_time.unwrap_or(self.entry_time);
        let occurred_at = DateTime::from_timestamp_millis(timestamp)
            .ok_or_else(|| {
                ApiError::ParseError(format!(
                    "Invalid timestamp: {} for trade {}",
                    timestamp, self.id
                ))
            })?
            .with_timezone(tz)
            .date_naive();

        Ok(Trade {
            id: self.id,
            symbol: self.symbol,
            direction: self.direction,
            pnl: self.pnl,
            entry_time: self.entry_time,
            exit_time: self.exit_time,
            strategy: self.strategy,
            asset_class: self.asset_class,
            tags: self
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            occurred_at,
        })
    }
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}
