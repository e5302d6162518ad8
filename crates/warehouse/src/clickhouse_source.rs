//! Warehouse-backed funnel source. Issues a single parameterised query over
//! the configured full-funnel table.

use async_trait::async_trait;
use chrono::NaiveDate;
use funnel_core::config::WarehouseConfig;
use funnel_core::{DashResult, DashboardError, FunnelRecord, RawFunnelRow, RawMeasure};
use serde::Deserialize;
use std::time::Instant;
use tracing::{error, info};

use crate::source::{normalize_rows, FunnelSource};

/// Row shape returned by [`ClickHouseSource::query_sql`]. Every column is
/// cast to a nullable type so missing values reach normalisation intact.
#[derive(Debug, clickhouse::Row, Deserialize)]
struct WarehouseRow {
    date: String,
    channel: Option<String>,
    funnel_type: Option<String>,
    state_name: Option<String>,
    campaign: Option<String>,
    impressions: Option<f64>,
    clicks: Option<f64>,
    conversions: Option<f64>,
    cost: Option<f64>,
    leads: Option<f64>,
    disqualifications: Option<f64>,
    appointments: Option<String>,
}

impl From<WarehouseRow> for RawFunnelRow {
    fn from(row: WarehouseRow) -> Self {
        RawFunnelRow {
            date: row.date,
            channel: row.channel,
            funnel_type: row.funnel_type,
            state_name: row.state_name,
            campaign: row.campaign,
            impressions: row.impressions.map(RawMeasure::Number),
            clicks: row.clicks.map(RawMeasure::Number),
            conversions: row.conversions.map(RawMeasure::Number),
            cost: row.cost.map(RawMeasure::Number),
            leads: row.leads.map(RawMeasure::Number),
            disqualifications: row.disqualifications.map(RawMeasure::Number),
            appointments: row.appointments.map(RawMeasure::Text),
        }
    }
}

pub struct ClickHouseSource {
    client: clickhouse::Client,
    table: String,
}

impl ClickHouseSource {
    pub fn new(config: &WarehouseConfig) -> DashResult<Self> {
        validate_table_name(&config.table)?;

        let mut client = clickhouse::Client::default()
            .with_url(&config.url)
            .with_database(&config.database);
        if let Some(user) = &config.user {
            client = client.with_user(user);
        }
        if let Some(password) = &config.password {
            client = client.with_password(password);
        }

        Ok(Self {
            client,
            table: config.table.clone(),
        })
    }

    fn query_sql(&self) -> String {
        format!(
            "SELECT
                toString(Date) AS date,
                CAST(Channel_Non_Truth AS Nullable(String)) AS channel,
                CAST(Type AS Nullable(String)) AS funnel_type,
                CAST(State_Name AS Nullable(String)) AS state_name,
                CAST(Campaign AS Nullable(String)) AS campaign,
                CAST(Impressions AS Nullable(Float64)) AS impressions,
                CAST(Clicks AS Nullable(Float64)) AS clicks,
                CAST(Conversions AS Nullable(Float64)) AS conversions,
                CAST(Cost AS Nullable(Float64)) AS cost,
                CAST(Number_of_reports__Salesforce_Reports AS Nullable(Float64)) AS leads,
                CAST(DQ AS Nullable(Float64)) AS disqualifications,
                CAST(Appts AS Nullable(String)) AS appointments
            FROM {}
            WHERE Date >= ? AND Date <= ?",
            self.table
        )
    }
}

/// Table names are interpolated into SQL, so only plain identifiers
/// (optionally `database.table`) are accepted.
fn validate_table_name(table: &str) -> DashResult<()> {
    let valid = !table.is_empty()
        && table.split('.').count() <= 2
        && table.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(DashboardError::Config(format!(
            "warehouse.table '{table}' is not a valid table identifier"
        )))
    }
}

#[async_trait]
impl FunnelSource for ClickHouseSource {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    async fn fetch_funnel_records(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DashResult<Vec<FunnelRecord>> {
        let started = Instant::now();
        let rows = self
            .client
            .query(&self.query_sql())
            .bind(start.format("%Y-%m-%d").to_string())
            .bind(end.format("%Y-%m-%d").to_string())
            .fetch_all::<WarehouseRow>()
            .await
            .map_err(|e| {
                error!(error = %e, table = %self.table, "Warehouse query failed");
                metrics::counter!("warehouse.query_errors").increment(1);
                DashboardError::Gateway(e.to_string())
            })?;

        let total = rows.len();
        let records = normalize_rows(rows.into_iter().map(RawFunnelRow::from), start, end);
        metrics::histogram!("warehouse.query_ms").record(started.elapsed().as_millis() as f64);
        info!(
            table = %self.table,
            %start,
            %end,
            rows = total,
            kept = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched funnel rows"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("full_funnel").is_ok());
        assert!(validate_table_name("marketing.full_funnel").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("t; DROP TABLE x").is_err());
        assert!(validate_table_name("db.").is_err());
    }

    #[test]
    fn test_new_rejects_bad_table() {
        let config = WarehouseConfig {
            table: "x--y".into(),
            ..Default::default()
        };
        assert!(matches!(
            ClickHouseSource::new(&config),
            Err(DashboardError::Config(_))
        ));
    }

    #[test]
    fn test_query_is_bounded_by_date_window() {
        let source = ClickHouseSource::new(&WarehouseConfig::default()).unwrap();
        let sql = source.query_sql();
        assert!(sql.contains("FROM full_funnel"));
        assert!(sql.contains("WHERE Date >= ? AND Date <= ?"));
    }

    #[test]
    fn test_warehouse_row_conversion_keeps_nulls() {
        let row = WarehouseRow {
            date: "2023-10-01".into(),
            channel: None,
            funnel_type: Some("Search".into()),
            state_name: Some("Utah".into()),
            campaign: None,
            impressions: Some(10.0),
            clicks: None,
            conversions: None,
            cost: Some(5.5),
            leads: None,
            disqualifications: None,
            appointments: Some("3".into()),
        };
        let record = FunnelRecord::from_raw(&RawFunnelRow::from(row)).unwrap();
        assert_eq!(record.channel, funnel_core::NOT_ENTERED);
        assert_eq!(record.impressions, 10);
        assert_eq!(record.clicks, 0);
        assert_eq!(record.appointments, 3);
        assert_eq!(record.cost, rust_decimal::Decimal::new(55, 1));
    }
}
