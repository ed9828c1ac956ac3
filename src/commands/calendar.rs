use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::state::JournalState;
use crate::analytics::{
    DayAggregate, PeriodSummary, aggregate, month_window, orphan_note_dates, summarize_days,
};
use crate::error::{CoreError, CoreResult};
use crate::models::{DateWindow, Trade};

/// One month of the trading calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub window: DateWindow,
    pub days: BTreeMap<NaiveDate, DayAggregate>,
    pub summary: PeriodSummary,
    /// Days with a note but no trades
    pub orphan_note_dates: Vec<NaiveDate>,
}

pub async fn get_calendar_month(
    state: &JournalState,
    account_id: &str,
    year: i32,
    month: u32,
) -> CoreResult<CalendarMonth> {
    let window = month_window(year, month)
        .ok_or_else(|| CoreError::InvalidDateKey(format!("{:04}-{:02}", year, month)))?;

    let trades: Vec<Trade> = state
        .trades
        .list_trades(account_id)
        .await?
        .into_iter()
        .filter(|trade| window.contains(trade.occurred_at))
        .collect();
    let notes = state.notes.load_notes(account_id, window).await?;

    let days = aggregate(&trades, &notes);
    let summary = summarize_days(&days);
    let orphan_note_dates = orphan_note_dates(&days, &notes);

    log::debug!(
        "Calendar {:04}-{:02} for {}: {} trading days, {} note-only days",
        year,
        month,
        account_id,
        days.len(),
        orphan_note_dates.len()
    );

    Ok(CalendarMonth {
        window,
        days,
        summary,
        orphan_note_dates,
    })
}
