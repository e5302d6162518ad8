//! Presentation adapter: turns pipeline output into metric widgets and
//! chart specifications the browser renders as-is.

use chrono::NaiveDate;
use funnel_core::{FilterState, FunnelRecord, MetricSelector};
use funnel_reporting::{
    compute_dq_breakdown, CostConversionTrend, DailyPoint, DailySeries, DashboardView, DqGroup, ScatterPoint,
    StateAggregate, SummaryMetrics,
};
use serde::Serialize;

/// Shown wherever a ratio is undefined.
pub const UNDEFINED: &str = "—";

// ─── Formatting ─────────────────────────────────────────────────────────────

/// `1234567` → `"1,234,567"`.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => UNDEFINED.to_string(),
    }
}

pub fn format_currency(value: Option<f64>) -> String {
    match value {
        Some(v) => {
            let cents = (v * 100.0).round() as u64;
            format!("${}.{:02}", format_count(cents / 100), cents % 100)
        }
        None => UNDEFINED.to_string(),
    }
}

// ─── Metric widgets ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MetricWidget {
    pub label: &'static str,
    pub value: String,
    pub raw: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricGroup {
    pub title: &'static str,
    pub widgets: Vec<MetricWidget>,
}

fn count_widget(label: &'static str, value: u64) -> MetricWidget {
    MetricWidget {
        label,
        value: format_count(value),
        raw: Some(value as f64),
    }
}

fn percent_widget(label: &'static str, value: Option<f64>) -> MetricWidget {
    MetricWidget {
        label,
        value: format_percent(value),
        raw: value,
    }
}

fn currency_widget(label: &'static str, value: Option<f64>) -> MetricWidget {
    MetricWidget {
        label,
        value: format_currency(value),
        raw: value,
    }
}

pub fn render_metrics(summary: &SummaryMetrics) -> Vec<MetricGroup> {
    let t = &summary.totals;
    vec![
        MetricGroup {
            title: "Clicks, Impressions, and CTR",
            widgets: vec![
                count_widget("Total Impressions", t.impressions),
                count_widget("Total Clicks", t.clicks),
                percent_widget("CTR", summary.ctr),
            ],
        },
        MetricGroup {
            title: "Leads, DQs, and CPL",
            widgets: vec![
                count_widget("Leads", t.leads),
                count_widget("DQs", t.disqualifications),
                currency_widget("CPL", summary.cpl),
            ],
        },
        MetricGroup {
            title: "Appts, L2A, and CPA",
            widgets: vec![
                count_widget("Appointments", t.appointments),
                percent_widget("L2A", summary.l2a),
                currency_widget("CPA", summary.cpa),
            ],
        },
    ]
}

// ─── Daily line charts ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Y,
    Y2,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    pub name: &'static str,
    pub axis: Axis,
    pub color: Option<&'static str>,
    pub x: Vec<NaiveDate>,
    /// `null` entries are gaps.
    pub y: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineChart {
    pub title: &'static str,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub y2_title: &'static str,
    pub traces: Vec<Trace>,
}

type DailyValue = fn(&DailyPoint) -> Option<f64>;

fn dual_axis_chart(
    daily: &DailySeries,
    titles: (&'static str, &'static str, &'static str),
    primary: (&'static str, Option<&'static str>, DailyValue),
    secondary: (&'static str, Option<&'static str>, DailyValue),
) -> LineChart {
    let x: Vec<NaiveDate> = daily.iter().map(|p| p.date).collect();
    LineChart {
        title: titles.0,
        x_title: "Date",
        y_title: titles.1,
        y2_title: titles.2,
        traces: vec![
            Trace {
                name: primary.0,
                axis: Axis::Y,
                color: primary.1,
                x: x.clone(),
                y: daily.iter().map(primary.2).collect(),
            },
            Trace {
                name: secondary.0,
                axis: Axis::Y2,
                color: secondary.1,
                x,
                y: daily.iter().map(secondary.2).collect(),
            },
        ],
    }
}

pub fn render_daily_charts(daily: &DailySeries) -> Vec<LineChart> {
    vec![
        dual_axis_chart(
            daily,
            ("Daily Clicks and CTR", "Clicks", "CTR (%)"),
            ("Daily Clicks", None, |p| Some(p.totals.clicks as f64)),
            ("CTR", None, |p| p.ctr),
        ),
        dual_axis_chart(
            daily,
            ("Daily Leads and CPL", "Leads", "CPL ($)"),
            ("Daily Leads", Some("red"), |p| Some(p.totals.leads as f64)),
            ("CPL", Some("orange"), |p| p.cpl),
        ),
        dual_axis_chart(
            daily,
            ("Daily Appts and CPA", "Appointments", "CPA ($)"),
            ("Daily Appts", Some("purple"), |p| Some(p.totals.appointments as f64)),
            ("CPA", Some("green"), |p| p.cpa),
        ),
    ]
}

// ─── State choropleth ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethMap {
    pub title: String,
    pub location_mode: &'static str,
    pub scope: &'static str,
    pub color_scale: &'static str,
    pub metric: MetricSelector,
    pub metric_label: &'static str,
    pub locations: Vec<String>,
    pub values: Vec<Option<f64>>,
}

pub fn render_state_map(aggregate: &StateAggregate, metric: MetricSelector) -> ChoroplethMap {
    ChoroplethMap {
        title: format!("{} by State", metric.label()),
        location_mode: "USA-states",
        scope: "usa",
        color_scale: "Viridis",
        metric,
        metric_label: metric.label(),
        locations: aggregate.rows.iter().map(|r| r.state.clone()).collect(),
        values: aggregate.rows.iter().map(|r| r.metric_value(metric)).collect(),
    }
}

// ─── DQ breakdown ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BarChart {
    pub title: &'static str,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DqPanel {
    pub total: String,
    pub dq_rate: String,
    pub by_channel: BarChart,
    pub by_type: Vec<DqGroup>,
}

pub fn render_dq_breakdown(filtered: &[FunnelRecord]) -> DqPanel {
    let breakdown = compute_dq_breakdown(filtered);
    DqPanel {
        total: format_count(breakdown.total_disqualifications),
        dq_rate: format_percent(breakdown.dq_rate),
        by_channel: BarChart {
            title: "DQs by Channel",
            categories: breakdown.by_channel.iter().map(|g| g.name.clone()).collect(),
            values: breakdown
                .by_channel
                .iter()
                .map(|g| g.disqualifications as f64)
                .collect(),
        },
        by_type: breakdown.by_type,
    }
}

// ─── Conversions vs cost ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TrendSegment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub r_squared: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterChart {
    pub title: &'static str,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub points: Vec<ScatterPoint>,
    pub trendline: Option<TrendSegment>,
}

pub fn render_cost_conversion_scatter(trend: &CostConversionTrend) -> ScatterChart {
    let trendline = trend.trendline.map(|line| {
        let (x0, x1) = trend
            .points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.cost), hi.max(p.cost))
            });
        TrendSegment {
            x0,
            y0: line.predict(x0),
            x1,
            y1: line.predict(x1),
            r_squared: line.r_squared,
        }
    });
    ScatterChart {
        title: "Conversions vs Cost",
        x_title: "Cost",
        y_title: "Conversions",
        points: trend.points.clone(),
        trendline,
    }
}

// ─── Whole dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub filter: FilterState,
    pub summary: SummaryMetrics,
    pub metrics: Vec<MetricGroup>,
    pub daily_charts: Vec<LineChart>,
    pub state_map: ChoroplethMap,
    pub dq: DqPanel,
    pub scatter: ScatterChart,
}

pub fn render_dashboard(view: &DashboardView) -> DashboardResponse {
    DashboardResponse {
        filter: view.filter.clone(),
        summary: view.summary.clone(),
        metrics: render_metrics(&view.summary),
        daily_charts: render_daily_charts(&view.daily),
        state_map: render_state_map(&view.states, view.states.metric),
        dq: render_dq_breakdown(&view.filtered),
        scatter: render_cost_conversion_scatter(&view.trend),
    }
}
