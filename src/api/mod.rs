pub mod client;
pub mod error;
pub mod exchange_rates;

pub use client::{
    FetchedRates, LogNotifier, NoteStore, Notifier, RateProvider, RateSnapshotStore, TradeStore,
};
pub use error::ApiError;
pub use exchange_rates::HttpRateProvider;
