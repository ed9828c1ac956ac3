use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::api::{HttpRateProvider, LogNotifier, NoteStore, Notifier, RateProvider, TradeStore};
use crate::db::{Database, SqliteRateStore};
use crate::error::CoreResult;
use crate::fx::{RateCache, SystemClock};
use crate::models::Settings;
use crate::sync::{NoteSyncController, RateRefreshScheduler};

/// Everything the commands need, shared by all callers.
pub struct JournalState {
    pub trades: Arc<dyn TradeStore>,
    pub notes: NoteSyncController,
    pub rates: Arc<RateCache>,
    pub settings: Settings,
}

impl JournalState {
    pub fn new(
        settings: Settings,
        trades: Arc<dyn TradeStore>,
        notes: NoteSyncController,
        rates: Arc<RateCache>,
    ) -> Self {
        Self {
            trades,
            notes,
            rates,
            settings,
        }
    }

    /// Wire the production collaborators: HTTP rate provider, optional SQLite
    /// rate persistence and log-only failure notifications.
    pub fn from_settings(
        settings: Settings,
        trades: Arc<dyn TradeStore>,
        note_store: Arc<dyn NoteStore>,
    ) -> CoreResult<Self> {
        let settings = settings.validate();

        let provider: Arc<dyn RateProvider> =
            Arc::new(HttpRateProvider::new(&settings.rate_endpoint)?);
        let mut cache = RateCache::new(
            settings.rate_cache_config(),
            provider,
            Arc::new(SystemClock),
        );

        if let Some(path) = &settings.database_path {
            let db = Arc::new(Database::new(path)?);
            cache = cache.with_store(Arc::new(SqliteRateStore::new(db)));
        } else {
            log::info!("No database path configured, exchange rates are kept in memory only");
        }

        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        let notes = NoteSyncController::with_notifier(note_store, notifier);

        Ok(Self::new(settings, trades, notes, Arc::new(cache)))
    }

    /// Background refresher for the rate cache, unless disabled in settings.
    pub fn rate_refresh_scheduler(&self) -> Option<RateRefreshScheduler> {
        self.settings
            .background_refresh_interval()
            .map(|interval| RateRefreshScheduler::new(Arc::clone(&self.rates), interval))
    }

    /// Current calendar day in the configured time zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now()
            .with_timezone(&self.settings.time_zone())
            .date_naive()
    }
}
