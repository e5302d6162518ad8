//! Overall totals and ratios for a filtered record set.

use funnel_core::FunnelRecord;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Summed funnel measures. Money and conversions stay decimal so sums do
/// not depend on record order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: Decimal,
    pub cost: Decimal,
    pub leads: u64,
    pub disqualifications: u64,
    pub appointments: u64,
}

impl Totals {
    pub fn add(&mut self, record: &FunnelRecord) {
        self.impressions += record.impressions;
        self.clicks += record.clicks;
        self.conversions += record.conversions;
        self.cost += record.cost;
        self.leads += record.leads;
        self.disqualifications += record.disqualifications;
        self.appointments += record.appointments;
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FunnelRecord>) -> Self {
        let mut totals = Totals::default();
        for record in records {
            totals.add(record);
        }
        totals
    }

    pub fn ctr(&self) -> Option<f64> {
        ratio(self.clicks as f64, self.impressions as f64)
    }

    pub fn cvr(&self) -> Option<f64> {
        ratio(decimal(self.conversions), self.impressions as f64)
    }

    pub fn cpc(&self) -> Option<f64> {
        ratio(decimal(self.cost), decimal(self.conversions))
    }

    pub fn cpl(&self) -> Option<f64> {
        ratio(decimal(self.cost), self.leads as f64)
    }

    pub fn cpa(&self) -> Option<f64> {
        ratio(decimal(self.cost), self.appointments as f64)
    }

    pub fn l2a(&self) -> Option<f64> {
        ratio(self.appointments as f64, self.leads as f64)
    }
}

/// Lossy conversion for ratio arithmetic.
pub fn decimal(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// `numerator / denominator`, or `None` when the denominator is zero or the
/// quotient is not finite.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub row_count: usize,
    #[serde(flatten)]
    pub totals: Totals,
    pub ctr: Option<f64>,
    pub cvr: Option<f64>,
    pub cpc: Option<f64>,
    pub cpl: Option<f64>,
    pub cpa: Option<f64>,
    pub l2a: Option<f64>,
}

pub fn compute_summary(filtered: &[FunnelRecord]) -> SummaryMetrics {
    let totals = Totals::from_records(filtered);
    SummaryMetrics {
        row_count: filtered.len(),
        totals,
        ctr: totals.ctr(),
        cvr: totals.cvr(),
        cpc: totals.cpc(),
        cpl: totals.cpl(),
        cpa: totals.cpa(),
        l2a: totals.l2a(),
    }
}
