//! The `FunnelSource` seam and the pieces every implementation shares.

use async_trait::async_trait;
use chrono::NaiveDate;
use funnel_core::config::{WarehouseBackend, WarehouseConfig};
use funnel_core::{DashResult, FunnelRecord, RawFunnelRow};
use std::sync::Arc;
use tracing::{info, warn};

use crate::clickhouse_source::ClickHouseSource;
use crate::json_file::JsonFileSource;

/// Produces the funnel dataset for an inclusive date window.
#[async_trait]
pub trait FunnelSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_funnel_records(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DashResult<Vec<FunnelRecord>>;
}

/// Normalise raw rows and keep those dated inside `start..=end`. Rows that
/// cannot be normalised are skipped and logged.
pub fn normalize_rows<I>(rows: I, start: NaiveDate, end: NaiveDate) -> Vec<FunnelRecord>
where
    I: IntoIterator<Item = RawFunnelRow>,
{
    let mut skipped = 0u64;
    let records: Vec<FunnelRecord> = rows
        .into_iter()
        .filter_map(|raw| match FunnelRecord::from_raw(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                skipped += 1;
                warn!(error = %e, date = %raw.date, "Skipping funnel row");
                None
            }
        })
        .filter(|r| r.date >= start && r.date <= end)
        .collect();
    if skipped > 0 {
        metrics::counter!("warehouse.rows_skipped").increment(skipped);
    }
    records
}

/// Fixed rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<RawFunnelRow>,
}

impl MemorySource {
    pub fn new(rows: Vec<RawFunnelRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl FunnelSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_funnel_records(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DashResult<Vec<FunnelRecord>> {
        Ok(normalize_rows(self.rows.iter().cloned(), start, end))
    }
}

/// Build the configured data source.
pub fn from_config(config: &WarehouseConfig) -> DashResult<Arc<dyn FunnelSource>> {
    let source: Arc<dyn FunnelSource> = match config.backend {
        WarehouseBackend::Clickhouse => Arc::new(ClickHouseSource::new(config)?),
        WarehouseBackend::Json => Arc::new(JsonFileSource::new(&config.fixture_path)),
    };
    info!(source = source.name(), "Data source configured");
    Ok(source)
}
