//! One render pass: filter once, derive everything from that filtered set.

use funnel_core::{FilterState, FunnelRecord, MetricSelector};
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use crate::daily::{compute_daily_series, DailySeries};
use crate::filter::apply_filters;
use crate::state_map::{compute_state_aggregate, StateAggregate};
use crate::summary::{compute_summary, SummaryMetrics};
use crate::trend::{compute_cost_conversion_trend, CostConversionTrend};

/// Everything a dashboard render needs, owned by that render only.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub filter: FilterState,
    #[serde(skip)]
    pub filtered: Vec<FunnelRecord>,
    pub summary: SummaryMetrics,
    pub daily: DailySeries,
    pub states: StateAggregate,
    pub trend: CostConversionTrend,
}

pub fn run_pipeline(
    dataset: &[FunnelRecord],
    filter: &FilterState,
    metric: MetricSelector,
) -> DashboardView {
    let started = Instant::now();
    let filtered = apply_filters(dataset, filter);
    let view = DashboardView {
        filter: filter.clone(),
        summary: compute_summary(&filtered),
        daily: compute_daily_series(&filtered),
        states: compute_state_aggregate(&filtered, metric),
        trend: compute_cost_conversion_trend(&filtered),
        filtered,
    };
    debug!(
        dataset_rows = dataset.len(),
        filtered_rows = view.filtered.len(),
        days = view.daily.len(),
        states = view.states.rows.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "Pipeline run complete"
    );
    view
}
