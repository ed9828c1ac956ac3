use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::date_range::DateRange;
use crate::fx::round2;
use crate::models::{DateWindow, Trade};

/// Trade filters. Every filter is a no-op when unset, blank or `"all"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsFilters {
    pub strategy_id: Option<String>,
    pub asset_class: Option<String>,
    /// Matches trades carrying any of these tags
    pub tags: Vec<String>,
}

/// Filters after dropping blank and placeholder values.
#[derive(Debug, Clone, Default, PartialEq)]
struct ActiveFilters {
    strategy_id: Option<String>,
    asset_class: Option<String>,
    tags: BTreeSet<String>,
}

fn active_value(raw: &Option<String>) -> Option<String> {
    let value = raw.as_deref()?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        log::debug!("Ignoring placeholder filter value '{}'", value);
        return None;
    }
    Some(value.to_string())
}

impl MetricsFilters {
    fn active(&self) -> ActiveFilters {
        ActiveFilters {
            strategy_id: active_value(&self.strategy_id),
            asset_class: active_value(&self.asset_class),
            tags: self
                .tags
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl ActiveFilters {
    fn matches(&self, trade: &Trade) -> bool {
        let strategy_ok = self
            .strategy_id
            .as_ref()
            .is_none_or(|s| trade.strategy == *s);
        let asset_ok = self
            .asset_class
            .as_ref()
            .is_none_or(|a| trade.asset_class == *a);
        let tags_ok = self.tags.is_empty() || !self.tags.is_disjoint(&trade.tags);

        strategy_ok && asset_ok && tags_ok
    }
}

/// Trades passing `filters` whose day falls inside `window` (`None` = unbounded).
pub fn filter_trades<'a>(
    trades: &'a [Trade],
    filters: &MetricsFilters,
    window: Option<DateWindow>,
) -> Vec<&'a Trade> {
    let active = filters.active();
    select(trades, &active, window)
}

fn select<'a>(trades: &'a [Trade], filters: &ActiveFilters, window: Option<DateWindow>) -> Vec<&'a Trade> {
    trades
        .iter()
        .filter(|t| window.is_none_or(|w| w.contains(t.occurred_at)))
        .filter(|t| filters.matches(t))
        .collect()
}

/// Profit factor, with an explicit state for "no losing trades" instead of an
/// infinite ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProfitFactor {
    Ratio(f64),
    NoLosses,
}

impl ProfitFactor {
    fn from_gross(gross_profit: f64, gross_loss: f64) -> Self {
        if gross_loss > 0.0 {
            ProfitFactor::Ratio(round2(gross_profit / gross_loss))
        } else if gross_profit > 0.0 {
            ProfitFactor::NoLosses
        } else {
            ProfitFactor::Ratio(0.0)
        }
    }

    pub fn ratio(&self) -> Option<f64> {
        match self {
            ProfitFactor::Ratio(value) => Some(*value),
            ProfitFactor::NoLosses => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    pub net_pnl: f64,
    pub gross_profit: f64,
    pub gross_loss: f64, // absolute value
    pub win_rate: f64,   // 0-100
    pub avg_win: f64,
    pub avg_loss: f64, // negative or 0
    pub profit_factor: ProfitFactor,
    pub best_trade: f64,
    pub worst_trade: f64,
}

impl PeriodMetrics {
    pub fn from_trades(trades: &[&Trade]) -> Self {
        let trade_count = trades.len();

        let mut wins = 0;
        let mut losses = 0;
        let mut gross_profit = 0.0;
        let mut loss_sum = 0.0;
        let mut net = 0.0;
        let mut best_trade: Option<f64> = None;
        let mut worst_trade: Option<f64> = None;

        for trade in trades {
            net += trade.pnl;
            if trade.is_win() {
                wins += 1;
                gross_profit += trade.pnl;
            } else if trade.is_loss() {
                losses += 1;
                loss_sum += trade.pnl;
            }
            best_trade = Some(best_trade.map_or(trade.pnl, |b| b.max(trade.pnl)));
            worst_trade = Some(worst_trade.map_or(trade.pnl, |w| w.min(trade.pnl)));
        }

        let gross_loss = loss_sum.abs();
        let win_rate = if trade_count > 0 {
            wins as f64 / trade_count as f64 * 100.0
        } else {
            0.0
        };
        let avg_win = if wins > 0 { gross_profit / wins as f64 } else { 0.0 };
        let avg_loss = if losses > 0 { loss_sum / losses as f64 } else { 0.0 };

        Self {
            trade_count,
            wins,
            losses,
            breakevens: trade_count - wins - losses,
            net_pnl: round2(net),
            gross_profit: round2(gross_profit),
            gross_loss: round2(gross_loss),
            win_rate: round2(win_rate),
            avg_win: round2(avg_win),
            avg_loss: round2(avg_loss),
            profit_factor: ProfitFactor::from_gross(gross_profit, gross_loss),
            best_trade: round2(best_trade.unwrap_or(0.0)),
            worst_trade: round2(worst_trade.unwrap_or(0.0)),
        }
    }
}

/// Current minus comparison period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDeltas {
    pub net_pnl: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub trade_count: i64,
    /// `None` when either side has no losing trades
    pub profit_factor: Option<f64>,
}

impl MetricsDeltas {
    fn between(current: &PeriodMetrics, previous: &PeriodMetrics) -> Self {
        Self {
            net_pnl: round2(current.net_pnl - previous.net_pnl),
            win_rate: round2(current.win_rate - previous.win_rate),
            avg_win: round2(current.avg_win - previous.avg_win),
            avg_loss: round2(current.avg_loss - previous.avg_loss),
            trade_count: current.trade_count as i64 - previous.trade_count as i64,
            profit_factor: match (current.profit_factor.ratio(), previous.profit_factor.ratio()) {
                (Some(c), Some(p)) => Some(round2(c - p)),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub range: DateRange,
    pub window: Option<DateWindow>,
    pub comparison_window: Option<DateWindow>,
    pub current: PeriodMetrics,
    pub previous: Option<PeriodMetrics>,
    pub deltas: Option<MetricsDeltas>,
}

/// Metrics for the filtered trades in `range`, plus the same metrics for the
/// comparison window computed under identical filters.
pub fn compute_metrics(trades: &[Trade], filters: &MetricsFilters, range: &DateRange) -> MetricsSnapshot {
    let active = filters.active();
    let window = range.window();
    let comparison_window = range.comparison_window();

    let current = PeriodMetrics::from_trades(&select(trades, &active, window));
    let previous =
        comparison_window.map(|w| PeriodMetrics::from_trades(&select(trades, &active, Some(w))));
    let deltas = previous
        .as_ref()
        .map(|previous| MetricsDeltas::between(&current, previous));

    MetricsSnapshot {
        range: *range,
        window,
        comparison_window,
        current,
        previous,
        deltas,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPerformance {
    pub strategy: String,
    pub metrics: PeriodMetrics,
}

/// Per-strategy metrics for the primary window, best net P&L first.
/// Equal P&L keeps the order strategies first appear in.
pub fn strategy_breakdown(
    trades: &[Trade],
    filters: &MetricsFilters,
    range: &DateRange,
) -> Vec<StrategyPerformance> {
    let selected = filter_trades(trades, filters, range.window());

    let mut groups: Vec<(&str, Vec<&Trade>)> = Vec::new();
    for trade in selected {
        match groups.iter_mut().find(|(name, _)| *name == trade.strategy) {
            Some((_, group)) => group.push(trade),
            None => groups.push((trade.strategy.as_str(), vec![trade])),
        }
    }

    let mut breakdown: Vec<StrategyPerformance> = groups
        .into_iter()
        .map(|(strategy, group)| StrategyPerformance {
            strategy: strategy.to_string(),
            metrics: PeriodMetrics::from_trades(&group),
        })
        .collect();

    breakdown.sort_by(|a, b| b.metrics.net_pnl.total_cmp(&a.metrics.net_pnl));
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::date_range::RangePreset;
    use crate::testing::{day, trade};

    fn tagged(mut t: Trade, tags: &[&str]) -> Trade {
        t.tags = tags.iter().map(|s| s.to_string()).collect();
        t
    }

    fn all_time() -> DateRange {
        DateRange::all(day("2024-12-31"))
    }

    #[test]
    fn test_no_losses_profit_factor_is_sentinel() {
        let trades = vec![
            trade("t1", "2024-01-01", 100.0, "A"),
            trade("t2", "2024-01-02", 50.0, "A"),
        ];

        let snapshot = compute_metrics(&trades, &MetricsFilters::default(), &all_time());
        assert_eq!(snapshot.current.profit_factor, ProfitFactor::NoLosses);
        assert_eq!(snapshot.current.profit_factor.ratio(), None);

        let json = serde_json::to_value(&snapshot.current.profit_factor).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "no_losses" }));
    }

    #[test]
    fn test_profit_factor_ratio() {
        let trades = vec![
            trade("t1", "2024-01-01", 300.0, "A"),
            trade("t2", "2024-01-02", -100.0, "A"),
            trade("t3", "2024-01-03", -50.0, "A"),
        ];

        let metrics = compute_metrics(&trades, &MetricsFilters::default(), &all_time()).current;
        assert_eq!(metrics.profit_factor, ProfitFactor::Ratio(2.0));
        assert_eq!(metrics.gross_loss, 150.0);
        assert_eq!(metrics.avg_win, 300.0);
        assert_eq!(metrics.avg_loss, -75.0);
        assert_eq!(metrics.net_pnl, 150.0);
        assert_eq!(metrics.win_rate, 33.33);
        assert_eq!(metrics.best_trade, 300.0);
        assert_eq!(metrics.worst_trade, -100.0);
    }

    #[test]
    fn test_empty_input_is_zeroed() {
        let snapshot = compute_metrics(&[], &MetricsFilters::default(), &all_time());
        let metrics = snapshot.current;
        assert_eq!(metrics.trade_count, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.net_pnl, 0.0);
        assert_eq!(metrics.avg_win, 0.0);
        assert_eq!(metrics.avg_loss, 0.0);
        assert_eq!(metrics.profit_factor, ProfitFactor::Ratio(0.0));
        assert!(snapshot.previous.is_none());
    }

    #[test]
    fn test_breakevens_count_against_win_rate() {
        let trades = vec![
            trade("t1", "2024-01-01", 10.0, "A"),
            trade("t2", "2024-01-01", 0.0, "A"),
        ];

        let metrics = compute_metrics(&trades, &MetricsFilters::default(), &all_time()).current;
        assert_eq!(metrics.breakevens, 1);
        assert_eq!(metrics.win_rate, 50.0);
        assert_eq!(metrics.profit_factor, ProfitFactor::NoLosses);
    }

    #[test]
    fn test_filters_are_a_conjunction() {
        let mut fx = trade("t3", "2024-01-01", 7.0, "A");
        fx.asset_class = "forex".to_string();

        let trades = vec![
            tagged(trade("t1", "2024-01-01", 10.0, "A"), &["news"]),
            tagged(trade("t2", "2024-01-01", 20.0, "B"), &["news"]),
            tagged(fx, &["news", "london"]),
            tagged(trade("t4", "2024-01-01", 40.0, "A"), &["asia"]),
        ];

        let filters = MetricsFilters {
            strategy_id: Some("A".to_string()),
            asset_class: Some("crypto".to_string()),
            tags: vec!["news".to_string(), "london".to_string()],
        };

        let ids: Vec<_> = filter_trades(&trades, &filters, None)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["t1"]);
    }

    #[test]
    fn test_placeholder_filters_are_ignored() {
        let trades = vec![
            trade("t1", "2024-01-01", 10.0, "A"),
            trade("t2", "2024-01-01", 20.0, "B"),
        ];

        let filters = MetricsFilters {
            strategy_id: Some("  ".to_string()),
            asset_class: Some("ALL".to_string()),
            tags: vec!["".to_string()],
        };

        assert_eq!(filter_trades(&trades, &filters, None).len(), 2);
    }

    #[test]
    fn test_comparison_window_uses_same_filters() {
        let trades = vec![
            trade("t1", "2024-01-10", 100.0, "A"),
            trade("t2", "2024-01-12", -40.0, "A"),
            trade("t3", "2024-01-13", 500.0, "B"),
            trade("t4", "2024-01-03", 30.0, "A"),
            trade("t5", "2024-01-05", 900.0, "B"),
            trade("t6", "2023-12-31", 1000.0, "A"),
        ];

        let filters = MetricsFilters {
            strategy_id: Some("A".to_string()),
            ..Default::default()
        };
        let range = DateRange::new(RangePreset::Week, day("2024-01-14"));

        let snapshot = compute_metrics(&trades, &filters, &range);
        assert_eq!(snapshot.current.trade_count, 2);
        assert_eq!(snapshot.current.net_pnl, 60.0);

        let previous = snapshot.previous.as_ref().unwrap();
        assert_eq!(previous.trade_count, 1);
        assert_eq!(previous.net_pnl, 30.0);

        let deltas = snapshot.deltas.unwrap();
        assert_eq!(deltas.net_pnl, 30.0);
        assert_eq!(deltas.trade_count, 1);
        assert_eq!(deltas.win_rate, -50.0);
        // Previous window has no losses, so no ratio delta
        assert_eq!(deltas.profit_factor, None);
    }

    #[test]
    fn test_compute_metrics_is_deterministic() {
        let trades = vec![
            trade("t1", "2024-01-10", 12.34, "A"),
            trade("t2", "2024-01-11", -5.67, "B"),
        ];
        let range = DateRange::new(RangePreset::Month, day("2024-01-31"));

        assert_eq!(
            compute_metrics(&trades, &MetricsFilters::default(), &range),
            compute_metrics(&trades, &MetricsFilters::default(), &range)
        );
    }

    #[test]
    fn test_strategy_breakdown_orders_by_net_pnl() {
        let trades = vec![
            trade("t1", "2024-01-01", 10.0, "A"),
            trade("t2", "2024-01-01", 50.0, "B"),
            trade("t3", "2024-01-02", 40.0, "A"),
            trade("t4", "2024-01-02", 5.0, "C"),
            trade("t5", "2024-01-03", 45.0, "C"),
        ];

        let breakdown = strategy_breakdown(&trades, &MetricsFilters::default(), &all_time());
        let order: Vec<_> = breakdown.iter().map(|s| s.strategy.as_str()).collect();
        // A, B and C all net 50: first appearance wins
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(breakdown[0].metrics.trade_count, 2);
    }
}
