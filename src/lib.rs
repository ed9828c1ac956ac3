//! Calendar, performance metrics, currency conversion and note sync for the
//! trading journal.
//!
//! Trades come from a [`api::TradeStore`], notes from a [`api::NoteStore`] and
//! exchange rates from a [`api::RateProvider`]. Everything is aggregated in
//! the base currency and only converted for display.

pub mod analytics;
pub mod api;
pub mod commands;
pub mod db;
pub mod error;
pub mod fx;
pub mod models;
pub mod sync;

#[cfg(test)]
mod testing;

pub use commands::JournalState;
pub use error::{CoreError, CoreResult};
