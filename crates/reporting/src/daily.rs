//! Per-day rollup feeding the line charts.

use chrono::NaiveDate;
use funnel_core::FunnelRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::summary::Totals;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
    pub ctr: Option<f64>,
    pub cpl: Option<f64>,
    pub cpa: Option<f64>,
}

/// One point per distinct calendar date, ascending.
pub type DailySeries = Vec<DailyPoint>;

pub fn compute_daily_series(filtered: &[FunnelRecord]) -> DailySeries {
    let mut by_day: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
    for record in filtered {
        by_day.entry(record.date).or_default().add(record);
    }

    by_day
        .into_iter()
        .map(|(date, totals)| DailyPoint {
            date,
            totals,
            ctr: totals.ctr(),
            cpl: totals.cpl(),
            cpa: totals.cpa(),
        })
        .collect()
}
