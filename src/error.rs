use chrono::NaiveDate;
use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Exchange rate unavailable for {0}")]
    RateUnavailable(String),

    #[error("Invalid date key: {0}")]
    InvalidDateKey(String),

    #[error("Failed to save note for {account_id} on {date}: {message}")]
    NoteSaveFailed {
        account_id: String,
        date: NaiveDate,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
