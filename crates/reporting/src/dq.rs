//! Disqualification breakdown by channel and type.

use funnel_core::{Dimension, FunnelRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::summary::ratio;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqGroup {
    pub name: String,
    pub disqualifications: u64,
    pub leads: u64,
    /// Share of leads disqualified; undefined without leads.
    pub dq_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqBreakdown {
    pub total_disqualifications: u64,
    pub total_leads: u64,
    pub dq_rate: Option<f64>,
    pub by_channel: Vec<DqGroup>,
    pub by_type: Vec<DqGroup>,
}

pub fn compute_dq_breakdown(filtered: &[FunnelRecord]) -> DqBreakdown {
    let total_disqualifications = filtered.iter().map(|r| r.disqualifications).sum();
    let total_leads = filtered.iter().map(|r| r.leads).sum();
    DqBreakdown {
        total_disqualifications,
        total_leads,
        dq_rate: ratio(total_disqualifications as f64, total_leads as f64),
        by_channel: group_by(filtered, Dimension::Channel),
        by_type: group_by(filtered, Dimension::Type),
    }
}

/// Groups ordered by DQ count descending, ties by name.
fn group_by(filtered: &[FunnelRecord], dim: Dimension) -> Vec<DqGroup> {
    let mut sums: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for record in filtered {
        let entry = sums.entry(record.dimension(dim)).or_default();
        entry.0 += record.disqualifications;
        entry.1 += record.leads;
    }

    let mut groups: Vec<DqGroup> = sums
        .into_iter()
        .map(|(name, (dq, leads))| DqGroup {
            name: name.to_string(),
            disqualifications: dq,
            leads,
            dq_rate: ratio(dq as f64, leads as f64),
        })
        .collect();
    groups.sort_by(|a, b| {
        b.disqualifications
            .cmp(&a.disqualifications)
            .then_with(|| a.name.cmp(&b.name))
    });
    groups
}
