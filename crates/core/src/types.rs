use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DashResult, DashboardError};

/// Category assigned to a missing or blank categorical value, so such rows
/// stay selectable and countable.
pub const NOT_ENTERED: &str = "Not Entered";

/// A measure as it arrives from a data source: a number, a numeric string,
/// arbitrary text, or any other JSON value (booleans, objects, arrays).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMeasure {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for RawMeasure {
    fn from(v: f64) -> Self {
        RawMeasure::Number(v)
    }
}

impl From<&str> for RawMeasure {
    fn from(v: &str) -> Self {
        RawMeasure::Text(v.to_string())
    }
}

/// One warehouse row before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFunnelRow {
    pub date: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default, rename = "type")]
    pub funnel_type: Option<String>,
    #[serde(default)]
    pub state_name: Option<String>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub impressions: Option<RawMeasure>,
    #[serde(default)]
    pub clicks: Option<RawMeasure>,
    #[serde(default)]
    pub conversions: Option<RawMeasure>,
    #[serde(default)]
    pub cost: Option<RawMeasure>,
    #[serde(default)]
    pub leads: Option<RawMeasure>,
    #[serde(default)]
    pub disqualifications: Option<RawMeasure>,
    #[serde(default)]
    pub appointments: Option<RawMeasure>,
}

/// One normalised aggregation unit of the funnel dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelRecord {
    pub date: NaiveDate,
    pub channel: String,
    #[serde(rename = "type")]
    pub funnel_type: String,
    pub state_name: String,
    pub campaign: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: Decimal,
    pub cost: Decimal,
    pub leads: u64,
    pub disqualifications: u64,
    pub appointments: u64,
}

/// The four categorical dimensions a dashboard user can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Channel,
    Type,
    State,
    Campaign,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Channel,
        Dimension::Type,
        Dimension::State,
        Dimension::Campaign,
    ];
}

impl FunnelRecord {
    /// Normalise a raw row: missing categories become [`NOT_ENTERED`],
    /// unusable measures become 0, and only the calendar date is kept.
    pub fn from_raw(raw: &RawFunnelRow) -> DashResult<Self> {
        Ok(Self {
            date: parse_calendar_date(&raw.date)?,
            channel: category(raw.channel.as_deref()),
            funnel_type: category(raw.funnel_type.as_deref()),
            state_name: category(raw.state_name.as_deref()),
            campaign: category(raw.campaign.as_deref()),
            impressions: count(raw.impressions.as_ref()),
            clicks: count(raw.clicks.as_ref()),
            conversions: amount(raw.conversions.as_ref()),
            cost: amount(raw.cost.as_ref()),
            leads: count(raw.leads.as_ref()),
            disqualifications: count(raw.disqualifications.as_ref()),
            appointments: count(raw.appointments.as_ref()),
        })
    }

    pub fn dimension(&self, dim: Dimension) -> &str {
        match dim {
            Dimension::Channel => &self.channel,
            Dimension::Type => &self.funnel_type,
            Dimension::State => &self.state_name,
            Dimension::Campaign => &self.campaign,
        }
    }
}

fn category(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_ENTERED.to_string(),
    }
}

/// Non-negative decimal value of a raw measure, 0 for anything else.
/// Floats go through their shortest decimal form, so `0.1` stays `0.1`.
fn amount(value: Option<&RawMeasure>) -> Decimal {
    let parsed = match value {
        Some(RawMeasure::Number(n)) if n.is_finite() => Decimal::from_str(&n.to_string()).ok(),
        Some(RawMeasure::Text(s)) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    };
    match parsed {
        Some(d) if d > Decimal::ZERO => d,
        _ => Decimal::ZERO,
    }
}

/// Integer measure, truncated toward zero.
fn count(value: Option<&RawMeasure>) -> u64 {
    let parsed = match value {
        Some(RawMeasure::Number(n)) => Some(*n),
        Some(RawMeasure::Text(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() && n > 0.0 => n.trunc() as u64,
        _ => 0,
    }
}

/// Calendar date of a date or timestamp string; time-of-day is discarded.
pub fn parse_calendar_date(value: &str) -> DashResult<NaiveDate> {
    let value = value.trim();
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.date_naive());
    }
    Err(DashboardError::InvalidRecord(format!(
        "unrecognised date '{value}'"
    )))
}

/// Column the state map is colored by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSelector {
    #[default]
    Appointments,
    Leads,
    Dq,
    Cost,
    Cpl,
    Cpa,
}

impl MetricSelector {
    pub const ALL: [MetricSelector; 6] = [
        MetricSelector::Appointments,
        MetricSelector::Leads,
        MetricSelector::Dq,
        MetricSelector::Cost,
        MetricSelector::Cpl,
        MetricSelector::Cpa,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricSelector::Appointments => "Appointments",
            MetricSelector::Leads => "Leads",
            MetricSelector::Dq => "DQ",
            MetricSelector::Cost => "Cost",
            MetricSelector::Cpl => "CPL",
            MetricSelector::Cpa => "CPA",
        }
    }
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MetricSelector {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricSelector::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DashboardError::InvalidFilter(format!("unknown map metric '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str) -> RawFunnelRow {
        RawFunnelRow {
            date: date.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_categories_become_not_entered() {
        let mut row = raw("2023-10-01");
        row.channel = Some("   ".into());
        row.funnel_type = Some("Search".into());
        let rec = FunnelRecord::from_raw(&row).unwrap();
        assert_eq!(rec.channel, NOT_ENTERED);
        assert_eq!(rec.funnel_type, "Search");
        assert_eq!(rec.state_name, NOT_ENTERED);
        assert_eq!(rec.campaign, NOT_ENTERED);
    }

    #[test]
    fn test_appointments_coerced_to_non_negative_integer() {
        let cases: [(Option<RawMeasure>, u64); 6] = [
            (None, 0),
            (Some("abc".into()), 0),
            (Some("".into()), 0),
            (Some("7".into()), 7),
            (Some(3.9.into()), 3),
            (Some((-2.0).into()), 0),
        ];
        for (input, expected) in cases {
            let mut row = raw("2023-10-01");
            row.appointments = input.clone();
            let rec = FunnelRecord::from_raw(&row).unwrap();
            assert_eq!(rec.appointments, expected, "input {input:?}");
        }
    }

    #[test]
    fn test_non_finite_cost_is_zero() {
        let mut row = raw("2023-10-01");
        row.cost = Some(f64::NAN.into());
        row.conversions = Some("2.5".into());
        let rec = FunnelRecord::from_raw(&row).unwrap();
        assert_eq!(rec.cost, Decimal::ZERO);
        assert_eq!(rec.conversions, Decimal::new(25, 1));
    }

    #[test]
    fn test_date_formats_keep_calendar_date() {
        let expected = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
        for s in [
            "2023-10-01",
            "2023-10-01 23:59:59",
            "2023-10-01T08:15:00.250",
            "2023-10-01T08:15:00+02:00",
        ] {
            assert_eq!(parse_calendar_date(s).unwrap(), expected, "{s}");
        }
        assert!(matches!(
            parse_calendar_date("10/01/2023"),
            Err(DashboardError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_raw_row_deserializes_mixed_measures() {
        let json = r#"{
            "date": "2023-10-02",
            "channel": null,
            "type": "Display",
            "impressions": 120,
            "appointments": "n/a",
            "cost": "12.50"
        }"#;
        let row: RawFunnelRow = serde_json::from_str(json).unwrap();
        let rec = FunnelRecord::from_raw(&row).unwrap();
        assert_eq!(rec.funnel_type, "Display");
        assert_eq!(rec.channel, NOT_ENTERED);
        assert_eq!(rec.impressions, 120);
        assert_eq!(rec.appointments, 0);
        assert_eq!(rec.cost, Decimal::new(125, 1));
    }

    #[test]
    fn test_float_measures_keep_their_decimal_value() {
        let mut row = raw("2023-10-01");
        row.cost = Some(154.28_f64.into());
        row.conversions = Some(0.1_f64.into());
        let rec = FunnelRecord::from_raw(&row).unwrap();
        assert_eq!(rec.cost, Decimal::new(15428, 2));
        assert_eq!(rec.conversions, Decimal::new(1, 1));
    }

    #[test]
    fn test_non_numeric_json_measures_become_zero() {
        let json = r#"[
            {"date": "2023-10-01", "appointments": true, "cost": {"usd": 5}, "leads": [1, 2]},
            {"date": "2023-10-02", "appointments": "3", "clicks": false}
        ]"#;
        let rows: Vec<RawFunnelRow> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 2);
        let first = FunnelRecord::from_raw(&rows[0]).unwrap();
        assert_eq!(first.appointments, 0);
        assert_eq!(first.cost, Decimal::ZERO);
        assert_eq!(first.leads, 0);
        let second = FunnelRecord::from_raw(&rows[1]).unwrap();
        assert_eq!(second.appointments, 3);
        assert_eq!(second.clicks, 0);
    }

    #[test]
    fn test_metric_selector_parsing() {
        assert_eq!("dq".parse::<MetricSelector>().unwrap(), MetricSelector::Dq);
        assert_eq!("CPA".parse::<MetricSelector>().unwrap(), MetricSelector::Cpa);
        assert!("ROAS".parse::<MetricSelector>().is_err());
        assert_eq!(MetricSelector::default(), MetricSelector::Appointments);
    }
}
