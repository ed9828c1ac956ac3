pub mod converter;
pub mod currency;
pub mod rate_cache;

pub use converter::{convert, format, format_money, round2, round4, to_base};
pub use currency::{CurrencyInfo, currency_name, fallback_rates, supported_currencies, symbol_for};
pub use rate_cache::{Clock, ExchangeRateSet, RateCache, RateCacheConfig, RateOrigin, SystemClock};
