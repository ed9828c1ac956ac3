pub mod calendar;
pub mod date_range;
pub mod equity;
pub mod metrics;

pub use calendar::{
    DayAggregate, DaySummary, Emotion, NO_STRATEGY, PeriodSummary, aggregate, month_window,
    orphan_note_dates, summarize_days,
};
pub use date_range::{DateRange, RangePreset};
pub use equity::{EquityCurvePoint, equity_curve};
pub use metrics::{
    MetricsDeltas, MetricsFilters, MetricsSnapshot, PeriodMetrics, ProfitFactor,
    StrategyPerformance, compute_metrics, filter_trades, strategy_breakdown,
};
