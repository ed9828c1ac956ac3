use chrono::NaiveDate;

use super::state::JournalState;
use crate::analytics::{
    DateRange, EquityCurvePoint, MetricsFilters, MetricsSnapshot, RangePreset,
    StrategyPerformance, aggregate, compute_metrics, equity_curve, filter_trades,
    strategy_breakdown,
};
use crate::error::CoreResult;
use crate::models::{NoteMap, Trade};

fn resolve_range(state: &JournalState, range: RangePreset, anchor: Option<NaiveDate>) -> DateRange {
    DateRange::new(range, anchor.unwrap_or_else(|| state.today()))
}

/// Dashboard metrics for the range plus the preceding period. `anchor`
/// defaults to today in the configured time zone.
pub async fn get_dashboard_stats(
    state: &JournalState,
    account_id: &str,
    filters: &MetricsFilters,
    range: RangePreset,
    anchor: Option<NaiveDate>,
) -> CoreResult<MetricsSnapshot> {
    let trades = state.trades.list_trades(account_id).await?;
    let range = resolve_range(state, range, anchor);

    Ok(compute_metrics(&trades, filters, &range))
}

pub async fn get_strategy_breakdown(
    state: &JournalState,
    account_id: &str,
    filters: &MetricsFilters,
    range: RangePreset,
    anchor: Option<NaiveDate>,
) -> CoreResult<Vec<StrategyPerformance>> {
    let trades = state.trades.list_trades(account_id).await?;
    let range = resolve_range(state, range, anchor);

    Ok(strategy_breakdown(&trades, filters, &range))
}

pub async fn get_equity_curve(
    state: &JournalState,
    account_id: &str,
    range: RangePreset,
    anchor: Option<NaiveDate>,
) -> CoreResult<Vec<EquityCurvePoint>> {
    let trades = state.trades.list_trades(account_id).await?;
    let range = resolve_range(state, range, anchor);

    let in_range: Vec<Trade> = filter_trades(&trades, &MetricsFilters::default(), range.window())
        .into_iter()
        .cloned()
        .collect();

    Ok(equity_curve(&aggregate(&in_range, &NoteMap::new())))
}
