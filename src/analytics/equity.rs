use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::DayAggregate;
use crate::fx::round2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub date: NaiveDate,
    pub daily_pnl: f64,
    pub cumulative_pnl: f64,
    pub trade_count: usize,
}

/// Running P&L over trading days, oldest first.
pub fn equity_curve(days: &BTreeMap<NaiveDate, DayAggregate>) -> Vec<EquityCurvePoint> {
    let mut cumulative = 0.0;

    days.values()
        .map(|day| {
            cumulative += day.total_pnl;
            EquityCurvePoint {
                date: day.date,
                daily_pnl: day.total_pnl,
                cumulative_pnl: round2(cumulative),
                trade_count: day.trade_count,
            }
        })
        .collect()
}
