//! Record selection and the distinct values offered as filter choices.

use chrono::NaiveDate;
use funnel_core::{Dimension, FilterState, FunnelRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Records that satisfy the date range and every categorical selection,
/// evaluated as one combined predicate per record.
pub fn apply_filters(dataset: &[FunnelRecord], filter: &FilterState) -> Vec<FunnelRecord> {
    dataset
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect()
}

/// Choices available to the filter controls for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub channels: Vec<String>,
    pub types: Vec<String>,
    pub states: Vec<String>,
    pub campaigns: Vec<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

impl FilterOptions {
    pub fn values(&self, dim: Dimension) -> &[String] {
        match dim {
            Dimension::Channel => &self.channels,
            Dimension::Type => &self.types,
            Dimension::State => &self.states,
            Dimension::Campaign => &self.campaigns,
        }
    }
}

pub fn filter_options(dataset: &[FunnelRecord]) -> FilterOptions {
    let distinct = |dim: Dimension| -> Vec<String> {
        dataset
            .iter()
            .map(|r| r.dimension(dim).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };
    FilterOptions {
        channels: distinct(Dimension::Channel),
        types: distinct(Dimension::Type),
        states: distinct(Dimension::State),
        campaigns: distinct(Dimension::Campaign),
        min_date: dataset.iter().map(|r| r.date).min(),
        max_date: dataset.iter().map(|r| r.date).max(),
    }
}
