use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::fx::round2;
use crate::models::{DateWindow, NoteMap, Trade};

/// Reported as `best_strategy` for a day without winning trades.
pub const NO_STRATEGY: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Positive,
    Neutral,
    Negative,
}

impl Emotion {
    fn from_pnl(pnl: f64) -> Self {
        if pnl > 0.0 {
            Emotion::Positive
        } else if pnl < 0.0 {
            Emotion::Negative
        } else {
            Emotion::Neutral
        }
    }
}

/// Statistics for one calendar day with at least one trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAggregate {
    pub date: NaiveDate,
    pub trades: Vec<Trade>, // input order
    pub total_pnl: f64,
    pub trade_count: usize,
    pub win_rate: u32, // 0-100
    pub emotion: Emotion,
    pub best_strategy: String,
    pub best_trade: Option<Trade>,
    pub worst_trade: Option<Trade>,
    pub note: Option<String>,
}

impl DayAggregate {
    fn from_trades(date: NaiveDate, trades: Vec<Trade>) -> Self {
        let trade_count = trades.len();
        let total_pnl = round2(trades.iter().map(|t| t.pnl).sum());
        let wins = trades.iter().filter(|t| t.is_win()).count();

        let win_rate = if trade_count > 0 {
            (wins as f64 / trade_count as f64 * 100.0).round() as u32
        } else {
            0
        };

        // Strict comparisons keep the first-encountered trade on ties
        let mut best_trade: Option<&Trade> = None;
        let mut worst_trade: Option<&Trade> = None;
        for trade in &trades {
            if best_trade.is_none_or(|best| trade.pnl > best.pnl) {
                best_trade = Some(trade);
            }
            if worst_trade.is_none_or(|worst| trade.pnl < worst.pnl) {
                worst_trade = Some(trade);
            }
        }

        Self {
            date,
            total_pnl,
            trade_count,
            win_rate,
            emotion: Emotion::from_pnl(total_pnl),
            best_strategy: best_strategy(&trades),
            best_trade: best_trade.cloned(),
            worst_trade: worst_trade.cloned(),
            note: None,
            trades,
        }
    }
}

/// Most frequent strategy among winning trades; ties go to the strategy seen first.
fn best_strategy(trades: &[Trade]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for trade in trades.iter().filter(|t| t.is_win()) {
        match counts.iter_mut().find(|(name, _)| *name == trade.strategy) {
            Some((_, count)) => *count += 1,
            None => counts.push((trade.strategy.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((name, count));
        }
    }

    best.map(|(name, _)| name.to_string())
        .unwrap_or_else(|| NO_STRATEGY.to_string())
}

/// Group trades by calendar day and attach notes.
///
/// Days exist only when they have at least one trade: a note whose date has no
/// trades is dropped here (see [`orphan_note_dates`] to surface those days).
/// The result depends on nothing but the inputs.
pub fn aggregate(trades: &[Trade], notes: &NoteMap) -> BTreeMap<NaiveDate, DayAggregate> {
    let mut by_day: BTreeMap<NaiveDate, Vec<Trade>> = BTreeMap::new();
    for trade in trades {
        by_day.entry(trade.occurred_at).or_default().push(trade.clone());
    }

    let mut days: BTreeMap<NaiveDate, DayAggregate> = by_day
        .into_iter()
        .map(|(date, trades)| (date, DayAggregate::from_trades(date, trades)))
        .collect();

    for (date, note) in notes {
        match days.get_mut(date) {
            Some(day) => day.note = Some(note.clone()),
            None => log::debug!("Dropping note for {} (no trades that day)", date),
        }
    }

    days
}

/// Note dates that have no trading day in `days`.
pub fn orphan_note_dates(days: &BTreeMap<NaiveDate, DayAggregate>, notes: &NoteMap) -> Vec<NaiveDate> {
    notes
        .keys()
        .filter(|date| !days.contains_key(*date))
        .copied()
        .collect()
}

/// First through last day of a calendar month. `None` for an invalid month.
pub fn month_window(year: i32, month: u32) -> Option<DateWindow> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let end = next_month.pred_opt()?;
    debug_assert_eq!(end.month(), start.month());
    Some(DateWindow::new(start, end))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_pnl: f64,
}

/// Totals across a set of trading days (a month view footer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub total_pnl: f64,
    pub trade_count: usize,
    pub trading_days: usize,
    pub green_days: usize,
    pub red_days: usize,
    pub flat_days: usize,
    pub best_day: Option<DaySummary>,
    pub worst_day: Option<DaySummary>,
}

pub fn summarize_days(days: &BTreeMap<NaiveDate, DayAggregate>) -> PeriodSummary {
    let mut summary = PeriodSummary {
        total_pnl: 0.0,
        trade_count: 0,
        trading_days: days.len(),
        green_days: 0,
        red_days: 0,
        flat_days: 0,
        best_day: None,
        worst_day: None,
    };

    let mut total = 0.0;
    // Ascending date order, so strict comparisons keep the earliest day on ties
    for day in days.values() {
        total += day.total_pnl;
        summary.trade_count += day.trade_count;

        match day.emotion {
            Emotion::Positive => summary.green_days += 1,
            Emotion::Negative => summary.red_days += 1,
            Emotion::Neutral => summary.flat_days += 1,
        }

        if summary
            .best_day
            .as_ref()
            .is_none_or(|best| day.total_pnl > best.total_pnl)
        {
            summary.best_day = Some(DaySummary { date: day.date, total_pnl: day.total_pnl });
        }
        if summary
            .worst_day
            .as_ref()
            .is_none_or(|worst| day.total_pnl < worst.total_pnl)
        {
            summary.worst_day = Some(DaySummary { date: day.date, total_pnl: day.total_pnl });
        }
    }

    summary.total_pnl = round2(total);
    summary
}
