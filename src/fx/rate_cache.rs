//! Exchange-rate cache with a freshness window, single-flight refresh and
//! static fallback data.
//!
//! ```plain
//!   get_rates()
//!       │
//!       ├── cached set younger than `freshness` ──────────► cached set
//!       │
//!       ├── refresh already in flight ──► await it ───────► its result
//!       │
//!       ├── last refresh failed < `failure_backoff` ago ──► stale set or fallback
//!       │
//!       └── start refresh ─┬─ ok ──► replace cache ───────► new set
//!                          └─ err ─► keep cache ──────────► stale set or fallback
//! ```
//!
//! Concurrent callers that arrive while a refresh is running wait for that
//! refresh and share its result; they never start a second one. The refresh
//! future is stored in the cache, so a caller that is cancelled mid-refresh
//! leaves it to be driven to completion by the next caller.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::currency::fallback_rates;
use crate::api::{ApiError, FetchedRates, RateProvider, RateSnapshotStore};
use crate::error::{CoreError, CoreResult};

/// Where a served rate set came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateOrigin {
    #[default]
    Provider,
    Persisted,
    Fallback,
}

/// Rates relative to `base`, cached at `timestamp` (Unix milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateSet {
    pub base: String,
    pub rates: BTreeMap<String, f64>,
    pub timestamp: i64,
    #[serde(skip)]
    pub origin: RateOrigin,
}

impl ExchangeRateSet {
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(&code.trim().to_uppercase()).copied()
    }

    pub fn is_fresh(&self, now_millis: i64, freshness: Duration) -> bool {
        let age = now_millis.saturating_sub(self.timestamp);
        i128::from(age) < freshness.as_millis() as i128
    }

    fn fallback(base: &str) -> Self {
        Self {
            base: base.to_string(),
            rates: fallback_rates(base),
            timestamp: 0,
            origin: RateOrigin::Fallback,
        }
    }
}

/// Time source, injectable so staleness can be controlled in tests.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    pub base_currency: String,
    pub freshness: Duration,
    pub failure_backoff: Duration,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            base_currency: "USD".to_string(),
            freshness: Duration::from_secs(24 * 60 * 60),
            failure_backoff: Duration::from_secs(300),
        }
    }
}

type RefreshFuture = Shared<BoxFuture<'static, ExchangeRateSet>>;

#[derive(Default)]
struct CacheState {
    current: Option<ExchangeRateSet>,
    hydrated: bool,
    in_flight: Option<RefreshFuture>,
    last_failure_at: Option<i64>,
}

impl CacheState {
    fn stale_or_fallback(&self, base: &str) -> ExchangeRateSet {
        match &self.current {
            Some(current) => current.clone(),
            None => ExchangeRateSet::fallback(base),
        }
    }
}

pub struct RateCache {
    config: RateCacheConfig,
    provider: Arc<dyn RateProvider>,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn RateSnapshotStore>>,
    state: Arc<Mutex<CacheState>>,
}

impl RateCache {
    pub fn new(
        config: RateCacheConfig,
        provider: Arc<dyn RateProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            provider,
            clock,
            store: None,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Persist successful refreshes to `store` and hydrate from it on first use.
    pub fn with_store(mut self, store: Arc<dyn RateSnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn base_currency(&self) -> &str {
        &self.config.base_currency
    }

    /// Current rates: fresh cache, else one (shared) refresh, else stale cache,
    /// else the static fallback table. Never fails.
    pub async fn get_rates(&self) -> ExchangeRateSet {
        let refresh = {
            let mut state = self.state.lock().await;
            self.hydrate(&mut state);

            let now = self.clock.now_millis();
            if let Some(current) = &state.current {
                if current.is_fresh(now, self.config.freshness) {
                    return current.clone();
                }
            }

            if let Some(in_flight) = &state.in_flight {
                in_flight.clone()
            } else if self.in_backoff(&state, now) {
                log::debug!("Rate refresh in failure backoff, serving cached or fallback rates");
                return state.stale_or_fallback(&self.config.base_currency);
            } else {
                let refresh = self.start_refresh();
                state.in_flight = Some(refresh.clone());
                refresh
            }
        };

        refresh.await
    }

    /// Refresh only when the cached set is missing or stale. Returns whether
    /// a refresh (or a wait on one) happened.
    pub async fn refresh_if_stale(&self) -> bool {
        {
            let mut state = self.state.lock().await;
            self.hydrate(&mut state);
            let now = self.clock.now_millis();
            if let Some(current) = &state.current {
                if current.is_fresh(now, self.config.freshness) {
                    return false;
                }
            }
        }

        self.get_rates().await;
        true
    }

    /// Cached set without triggering any refresh.
    pub async fn peek(&self) -> Option<ExchangeRateSet> {
        let mut state = self.state.lock().await;
        self.hydrate(&mut state);
        state.current.clone()
    }

    /// Rate for a single currency: current set first, then the static table.
    pub async fn rate_for(&self, code: &str) -> CoreResult<f64> {
        let rates = self.get_rates().await;
        if let Some(rate) = rates.rate(code) {
            return Ok(rate);
        }

        fallback_rates(&self.config.base_currency)
            .get(&code.trim().to_uppercase())
            .copied()
            .ok_or_else(|| CoreError::RateUnavailable(code.to_string()))
    }

    fn in_backoff(&self, state: &CacheState, now: i64) -> bool {
        match state.last_failure_at {
            Some(failed_at) => {
                i128::from(now.saturating_sub(failed_at))
                    < self.config.failure_backoff.as_millis() as i128
            }
            None => false,
        }
    }

    fn hydrate(&self, state: &mut CacheState) {
        if state.hydrated {
            return;
        }
        state.hydrated = true;

        let Some(store) = &self.store else {
            return;
        };

        match store.load() {
            Ok(Some(mut persisted)) if persisted.base == self.config.base_currency => {
                log::info!(
                    "Loaded persisted exchange rates ({} currencies, cached at {})",
                    persisted.rates.len(),
                    persisted.timestamp
                );
                persisted.origin = RateOrigin::Persisted;
                state.current = Some(persisted);
            }
            Ok(Some(persisted)) => {
                log::warn!(
                    "Ignoring persisted rates for base {} (expected {})",
                    persisted.base,
                    self.config.base_currency
                );
            }
            Ok(None) => {}
            Err(e) => log::warn!("Failed to load persisted exchange rates: {}", e),
        }
    }

    fn start_refresh(&self) -> RefreshFuture {
        let provider = Arc::clone(&self.provider);
        let clock = Arc::clone(&self.clock);
        let store = self.store.clone();
        let state = Arc::clone(&self.state);
        let base = self.config.base_currency.clone();

        async move {
            log::info!("Refreshing exchange rates for {}", base);
            let fetched = provider.fetch_latest(&base).await;
            let now = clock.now_millis();

            let mut state = state.lock().await;
            state.in_flight = None;

            match fetched.and_then(|f| build_rate_set(&base, f, now)) {
                Ok(rates) => {
                    log::info!("Exchange rates refreshed ({} currencies)", rates.rates.len());
                    state.current = Some(rates.clone());
                    state.last_failure_at = None;

                    if let Some(store) = store {
                        if let Err(e) = store.save(&rates) {
                            log::warn!("Failed to persist exchange rates: {}", e);
                        }
                    }
                    rates
                }
                Err(e) => {
                    state.last_failure_at = Some(now);
                    let served = state.stale_or_fallback(&base);
                    log::warn!(
                        "Exchange rate refresh failed: {} (serving {:?} rates)",
                        e,
                        served.origin
                    );
                    served
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Validate provider output into a cache entry. Non-finite and non-positive
/// rates are dropped and the base is pinned to 1.
fn build_rate_set(base: &str, fetched: FetchedRates, now: i64) -> Result<ExchangeRateSet, ApiError> {
    let mut rates: BTreeMap<String, f64> = fetched
        .rates
        .into_iter()
        .map(|(code, rate)| (code.trim().to_uppercase(), rate))
        .filter(|(code, rate)| code != base && rate.is_finite() && *rate > 0.0)
        .collect();

    if rates.is_empty() {
        return Err(ApiError::ParseError("No usable exchange rates in response".to_string()));
    }

    rates.insert(base.to_string(), 1.0);

    Ok(ExchangeRateSet {
        base: base.to_string(),
        rates,
        timestamp: now,
        origin: RateOrigin::Provider,
    })
}
