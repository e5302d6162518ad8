//! Per-state rollup for the choropleth.

use funnel_core::{states, FunnelRecord, MetricSelector};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::summary::{decimal, Totals};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRow {
    /// Two-letter postal abbreviation.
    pub state: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: Decimal,
    pub cost: Decimal,
    #[serde(rename = "Leads")]
    pub leads: u64,
    pub disqualifications: u64,
    #[serde(rename = "Appointments")]
    pub appointments: u64,
    pub cpl: Option<f64>,
    pub cpa: Option<f64>,
}

impl StateRow {
    fn from_totals(state: &str, totals: &Totals) -> Self {
        Self {
            state: state.to_string(),
            impressions: totals.impressions,
            clicks: totals.clicks,
            conversions: totals.conversions,
            cost: totals.cost,
            leads: totals.leads,
            disqualifications: totals.disqualifications,
            appointments: totals.appointments,
            cpl: totals.cpl(),
            cpa: totals.cpa(),
        }
    }

    /// Value of the column the map is colored by.
    pub fn metric_value(&self, metric: MetricSelector) -> Option<f64> {
        match metric {
            MetricSelector::Appointments => Some(self.appointments as f64),
            MetricSelector::Leads => Some(self.leads as f64),
            MetricSelector::Dq => Some(self.disqualifications as f64),
            MetricSelector::Cost => Some(decimal(self.cost)),
            MetricSelector::Cpl => self.cpl,
            MetricSelector::Cpa => self.cpa,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAggregate {
    pub metric: MetricSelector,
    /// Sorted by abbreviation.
    pub rows: Vec<StateRow>,
}

impl StateAggregate {
    pub fn get(&self, abbreviation: &str) -> Option<&StateRow> {
        self.rows.iter().find(|r| r.state == abbreviation)
    }
}

/// Group by state abbreviation. Records whose state name is not in the
/// lookup are left out of this view only.
pub fn compute_state_aggregate(filtered: &[FunnelRecord], metric: MetricSelector) -> StateAggregate {
    let mut by_state: BTreeMap<&'static str, Totals> = BTreeMap::new();
    let mut unmapped = 0usize;
    for record in filtered {
        match states::abbreviation(&record.state_name) {
            Some(abbr) => by_state.entry(abbr).or_default().add(record),
            None => unmapped += 1,
        }
    }
    if unmapped > 0 {
        debug!(unmapped, "Records without a state abbreviation left off the map");
    }

    StateAggregate {
        metric,
        rows: by_state
            .iter()
            .map(|(abbr, totals)| StateRow::from_totals(abbr, totals))
            .collect(),
    }
}
