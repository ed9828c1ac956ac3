use std::collections::BTreeMap;
use std::sync::Arc;

use rusqlite::{OptionalExtension, params};

use super::Database;
use crate::api::{ApiError, RateSnapshotStore};
use crate::fx::{ExchangeRateSet, RateOrigin};

/// Keeps the single cached rate set in the `rate_cache` table.
pub struct SqliteRateStore {
    db: Arc<Database>,
}

impl SqliteRateStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl RateSnapshotStore for SqliteRateStore {
    fn load(&self) -> Result<Option<ExchangeRateSet>, ApiError> {
        let conn = self
            .db
            .conn
            .lock()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        let row: Option<(String, String, i64)> = conn
            .query_row(
                "SELECT base_currency, rates, timestamp FROM rate_cache WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((base, rates_json, timestamp)) = row else {
            return Ok(None);
        };

        let rates: BTreeMap<String, f64> = serde_json::from_str(&rates_json)?;
        Ok(Some(ExchangeRateSet {
            base,
            rates,
            timestamp,
            origin: RateOrigin::Persisted,
        }))
    }

    fn save(&self, rates: &ExchangeRateSet) -> Result<(), ApiError> {
        let rates_json = serde_json::to_string(&rates.rates)?;
        let conn = self
            .db
            .conn
            .lock()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO rate_cache (id, base_currency, rates, timestamp, updated_at)
             VALUES (1, ?, ?, ?, ?)",
            params![
                rates.base,
                rates_json,
                rates.timestamp,
                chrono::Utc::now().timestamp_millis()
            ],
        )?;

        log::debug!(
            "Persisted {} exchange rates (cached at {})",
            rates.rates.len(),
            rates.timestamp
        );
        Ok(())
    }
}
