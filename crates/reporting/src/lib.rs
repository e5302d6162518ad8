//! Funnel reporting: the filter-and-aggregate pipeline behind the dashboard.
//! Summary metrics, daily series, per-state rollups, DQ breakdowns and the
//! cost/conversion trend, all derived from one filtered record set.

pub mod daily;
pub mod dq;
pub mod filter;
pub mod pipeline;
pub mod state_map;
pub mod summary;
pub mod trend;

pub use daily::{compute_daily_series, DailyPoint, DailySeries};
pub use dq::{compute_dq_breakdown, DqBreakdown, DqGroup};
pub use filter::{apply_filters, filter_options, FilterOptions};
pub use pipeline::{run_pipeline, DashboardView};
pub use state_map::{compute_state_aggregate, StateAggregate, StateRow};
pub use summary::{compute_summary, decimal, ratio, SummaryMetrics, Totals};
pub use trend::{compute_cost_conversion_trend, CostConversionTrend, ScatterPoint, Trendline};
