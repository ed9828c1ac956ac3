//! In-memory collaborators shared by the unit tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::api::{
    ApiError, FetchedRates, NoteStore, Notifier, RateProvider, RateSnapshotStore, TradeStore,
};
use crate::commands::JournalState;
use crate::fx::{Clock, ExchangeRateSet, RateCache};
use crate::models::{
    Direction, JournalNote, NoteRecord, Settings, Trade, format_date_key, parse_date_key,
};
use crate::sync::NoteSyncController;

pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

pub fn trade(id: &str, date: &str, pnl: f64, strategy: &str) -> Trade {
    Trade {
        id: id.to_string(),
        symbol: "BTCUSDT".to_string(),
        direction: Direction::Long,
        pnl,
        entry_time: 0,
        exit_time: None,
        strategy: strategy.to_string(),
        asset_class: "crypto".to_string(),
        tags: BTreeSet::new(),
        occurred_at: day(date),
    }
}

pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeRateProvider {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    rates: Mutex<BTreeMap<String, f64>>,
}

impl FakeRateProvider {
    pub fn with_rates(rates: &[(&str, f64)]) -> Self {
        let provider = Self::default();
        provider.set_rates(rates);
        provider
    }

    pub fn failing() -> Self {
        let provider = Self::default();
        provider.set_failing(true);
        provider
    }

    pub fn set_rates(&self, rates: &[(&str, f64)]) {
        *self.rates.lock().unwrap() = rates
            .iter()
            .map(|(code, rate)| (code.to_string(), *rate))
            .collect();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for FakeRateProvider {
    async fn fetch_latest(&self, _base_currency: &str) -> Result<FetchedRates, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::HttpStatus {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let rates = self.rates.lock().unwrap().clone();
        Ok(FetchedRates {
            rates,
            fetched_at: 0,
        })
    }
}

#[derive(Default)]
pub struct MemoryRateStore {
    entry: Mutex<Option<ExchangeRateSet>>,
}

impl MemoryRateStore {
    pub fn seed(&self, rates: ExchangeRateSet) {
        *self.entry.lock().unwrap() = Some(rates);
    }

    pub fn saved(&self) -> Option<ExchangeRateSet> {
        self.entry.lock().unwrap().clone()
    }
}

impl RateSnapshotStore for MemoryRateStore {
    fn load(&self) -> Result<Option<ExchangeRateSet>, ApiError> {
        Ok(self.entry.lock().unwrap().clone())
    }

    fn save(&self, rates: &ExchangeRateSet) -> Result<(), ApiError> {
        *self.entry.lock().unwrap() = Some(rates.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTradeStore {
    trades: Mutex<HashMap<String, Vec<Trade>>>,
}

impl MemoryTradeStore {
    pub fn insert(&self, account_id: &str, trades: Vec<Trade>) {
        self.trades
            .lock()
            .unwrap()
            .entry(account_id.to_string())
            .or_default()
            .extend(trades);
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    async fn list_trades(&self, account_id: &str) -> Result<Vec<Trade>, ApiError> {
        Ok(self
            .trades
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Note store with switchable failures and artificial latency.
#[derive(Default)]
pub struct MemoryNoteStore {
    notes: Mutex<BTreeMap<(String, NaiveDate), (String, i64)>>,
    list_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    fail_upserts: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
    upsert_delay: Mutex<Option<Duration>>,
    clock: AtomicI64,
}

impl MemoryNoteStore {
    pub fn seed(&self, account_id: &str, date: &str, content: &str) {
        let updated_at = self.clock.fetch_add(1, Ordering::SeqCst);
        self.notes.lock().unwrap().insert(
            (account_id.to_string(), day(date)),
            (content.to_string(), updated_at),
        );
    }

    pub fn stored(&self, account_id: &str, date: &str) -> Option<String> {
        self.notes
            .lock()
            .unwrap()
            .get(&(account_id.to_string(), day(date)))
            .map(|(content, _)| content.clone())
    }

    pub fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_upsert_delay(&self, delay: Duration) {
        *self.upsert_delay.lock().unwrap() = Some(delay);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn list_notes(
        &self,
        account_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NoteRecord>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        // Snapshot before the delay so a slow read returns old data
        let rows: Vec<NoteRecord> = self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|((account, date), _)| account == account_id && start <= *date && *date <= end)
            .map(|((_, date), (content, updated_at))| NoteRecord {
                date: format_date_key(*date),
                content: content.clone(),
                updated_at: Some(*updated_at),
            })
            .collect();

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(rows)
    }

    async fn upsert_note(
        &self,
        account_id: &str,
        date: &str,
        content: &str,
    ) -> Result<JournalNote, ApiError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.upsert_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(ApiError::DatabaseError("upsert rejected".to_string()));
        }

        let date = parse_date_key(date).map_err(|e| ApiError::ParseError(e.to_string()))?;
        let updated_at = self.clock.fetch_add(1, Ordering::SeqCst);
        self.notes.lock().unwrap().insert(
            (account_id.to_string(), date),
            (content.to_string(), updated_at),
        );

        Ok(JournalNote {
            account_id: account_id.to_string(),
            date,
            content: content.to_string(),
            updated_at,
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_failure(&self, title: &str, body: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

/// A `JournalState` wired to in-memory fakes, with handles to each fake.
pub struct TestJournal {
    pub trades: Arc<MemoryTradeStore>,
    pub notes: Arc<MemoryNoteStore>,
    pub provider: Arc<FakeRateProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: JournalState,
}

impl TestJournal {
    pub fn new() -> Self {
        init_test_logging();

        let settings = Settings::default();
        let trades = Arc::new(MemoryTradeStore::default());
        let notes = Arc::new(MemoryNoteStore::default());
        let provider = Arc::new(FakeRateProvider::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let rates = RateCache::new(
            settings.rate_cache_config(),
            provider.clone(),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        );
        let state = JournalState::new(
            settings,
            trades.clone(),
            NoteSyncController::with_notifier(notes.clone(), notifier.clone()),
            Arc::new(rates),
        );

        Self {
            trades,
            notes,
            provider,
            notifier,
            state,
        }
    }
}
