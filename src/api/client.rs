use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::fx::ExchangeRateSet;
use crate::models::{JournalNote, NoteRecord, Trade};

/// Latest rates as reported by a rate provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedRates {
    /// Currency code -> units of that currency per one unit of the base
    pub rates: BTreeMap<String, f64>,
    /// Unix milliseconds
    pub fetched_at: i64,
}

/// Source of live exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetch the latest rates relative to `base_currency`
    async fn fetch_latest(&self, base_currency: &str) -> Result<FetchedRates, ApiError>;
}

/// The only entry point for trade data. Results are already access-controlled.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn list_trades(&self, account_id: &str) -> Result<Vec<Trade>, ApiError>;
}

/// Remote journal note persistence.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// List notes for days in `start..=end`
    async fn list_notes(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NoteRecord>, ApiError>;

    /// Insert or replace the note for (account_id, date)
    async fn upsert_note(
        &self,
        account_id: &str,
        date: &str,
        content: &str,
    ) -> Result<JournalNote, ApiError>;
}

/// Local single-entry persistence for the exchange-rate cache.
pub trait RateSnapshotStore: Send + Sync {
    fn load(&self) -> Result<Option<ExchangeRateSet>, ApiError>;

    /// Overwrite the stored entry wholesale
    fn save(&self, rates: &ExchangeRateSet) -> Result<(), ApiError>;
}

/// User-facing failure notifications.
pub trait Notifier: Send + Sync {
    fn notify_failure(&self, title: &str, body: &str);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_failure(&self, title: &str, body: &str) {
        log::error!("{}: {}", title, body);
    }
}
