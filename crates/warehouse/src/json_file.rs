//! Funnel rows from a JSON export on disk, for offline and demo runs.

use async_trait::async_trait;
use chrono::NaiveDate;
use funnel_core::{DashResult, DashboardError, FunnelRecord, RawFunnelRow};
use std::path::PathBuf;
use tracing::info;

use crate::source::{normalize_rows, FunnelSource};

/// Reads a JSON array of raw funnel rows on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FunnelSource for JsonFileSource {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn fetch_funnel_records(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DashResult<Vec<FunnelRecord>> {
        let body = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DashboardError::Gateway(format!("reading {}: {e}", self.path.display()))
        })?;
        let rows: Vec<RawFunnelRow> = serde_json::from_str(&body).map_err(|e| {
            DashboardError::Gateway(format!("parsing {}: {e}", self.path.display()))
        })?;

        let total = rows.len();
        let records = normalize_rows(rows, start, end);
        info!(
            path = %self.path.display(),
            rows = total,
            kept = records.len(),
            "Loaded funnel rows from file"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("funnel-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_reads_rows_inside_window() {
        let path = temp_path();
        tokio::fs::write(
            &path,
            r#"[
                {"date": "2023-10-01", "channel": "Google", "impressions": 10, "appointments": "2"},
                {"date": "2023-10-02T10:00:00", "channel": null, "appointments": "x"},
                {"date": "2022-01-01", "channel": "Old"}
            ]"#,
        )
        .await
        .unwrap();

        let source = JsonFileSource::new(&path);
        let start = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 10, 31).unwrap();
        let records = source.fetch_funnel_records(start, end).await.unwrap();
        tokio::fs::remove_file(&path).await.ok();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].appointments, 2);
        assert_eq!(records[1].appointments, 0);
        assert_eq!(records[1].channel, funnel_core::NOT_ENTERED);
    }

    #[tokio::test]
    async fn test_boolean_measure_does_not_fail_the_file() {
        let path = temp_path();
        tokio::fs::write(
            &path,
            r#"[{"date":"2023-10-01","appointments":true},{"date":"2023-10-02","appointments":"3"}]"#,
        )
        .await
        .unwrap();

        let source = JsonFileSource::new(&path);
        let start = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 10, 31).unwrap();
        let records = source.fetch_funnel_records(start, end).await.unwrap();
        tokio::fs::remove_file(&path).await.ok();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].appointments, 0);
        assert_eq!(records[1].appointments, 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_gateway_failure() {
        let source = JsonFileSource::new(temp_path());
        let day = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
        let err = source.fetch_funnel_records(day, day).await.unwrap_err();
        assert!(matches!(err, DashboardError::Gateway(_)));
    }

    #[tokio::test]
    async fn test_malformed_json_is_gateway_failure() {
        let path = temp_path();
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let source = JsonFileSource::new(&path);
        let day = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
        let err = source.fetch_funnel_records(day, day).await.unwrap_err();
        tokio::fs::remove_file(&path).await.ok();
        assert!(matches!(err, DashboardError::Gateway(_)));
    }
}
