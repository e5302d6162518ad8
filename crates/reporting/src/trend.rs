//! Conversions-vs-cost scatter with an ordinary least squares trendline.

use funnel_core::FunnelRecord;

use crate::summary::decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub cost: f64,
    pub conversions: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trendline {
    pub slope: f64,
    pub intercept: f64,
    /// Undefined when conversions have no variance.
    pub r_squared: Option<f64>,
}

impl Trendline {
    pub fn predict(&self, cost: f64) -> f64 {
        self.intercept + self.slope * cost
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConversionTrend {
    pub points: Vec<ScatterPoint>,
    /// Needs at least two points and some spread in cost.
    pub trendline: Option<Trendline>,
}

pub fn compute_cost_conversion_trend(filtered: &[FunnelRecord]) -> CostConversionTrend {
    let points: Vec<ScatterPoint> = filtered
        .iter()
        .map(|r| ScatterPoint {
            cost: decimal(r.cost),
            conversions: decimal(r.conversions),
        })
        .collect();
    let trendline = fit(&points);
    CostConversionTrend { points, trendline }
}

fn fit(points: &[ScatterPoint]) -> Option<Trendline> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.cost).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.conversions).sum::<f64>() / n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.cost - mean_x;
        let dy = p.conversions - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let r_squared = if syy == 0.0 {
        None
    } else {
        Some((sxy * sxy) / (sxx * syy))
    };
    Some(Trendline {
        slope,
        intercept: mean_y - slope * mean_x,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;
    use rust_decimal::Decimal;

    fn rec(cost: f64, conversions: f64) -> FunnelRecord {
        let mut r = record(1);
        r.cost = Decimal::try_from(cost).unwrap();
        r.conversions = Decimal::try_from(conversions).unwrap();
        r
    }

    #[test]
    fn test_perfect_line() {
        let data = vec![rec(0.0, 1.0), rec(10.0, 3.0), rec(20.0, 5.0)];
        let trend = compute_cost_conversion_trend(&data);
        assert_eq!(trend.points.len(), 3);
        let line = trend.trendline.unwrap();
        assert!((line.slope - 0.2).abs() < 1e-12);
        assert!((line.intercept - 1.0).abs() < 1e-12);
        assert!((line.r_squared.unwrap() - 1.0).abs() < 1e-12);
        assert!((line.predict(30.0) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_conversions_have_undefined_r_squared() {
        let line = compute_cost_conversion_trend(&[rec(1.0, 2.0), rec(3.0, 2.0)])
            .trendline
            .unwrap();
        assert_eq!(line.slope, 0.0);
        assert_eq!(line.intercept, 2.0);
        assert_eq!(line.r_squared, None);
    }

    #[test]
    fn test_degenerate_inputs_have_no_trendline() {
        assert_eq!(compute_cost_conversion_trend(&[]).trendline, None);
        assert_eq!(compute_cost_conversion_trend(&[rec(5.0, 1.0)]).trendline, None);
        assert_eq!(
            compute_cost_conversion_trend(&[rec(5.0, 1.0), rec(5.0, 4.0)]).trendline,
            None
        );
    }
}
