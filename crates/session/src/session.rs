//! Per-session dashboard state: the cached dataset, filters and map metric.

use funnel_core::{DashResult, DashboardError, DateBounds, FilterSession, FunnelRecord, MetricSelector};
use funnel_warehouse::FunnelSource;
use std::sync::Arc;
use tracing::{error, info};

/// Dataset cache for one session. A failed fetch sticks until the session
/// is replaced.
#[derive(Debug, Clone)]
pub enum DatasetSlot {
    Pending,
    Loaded(Arc<Vec<FunnelRecord>>),
    Failed(String),
}

#[derive(Debug)]
pub struct DashboardSession {
    pub dataset: DatasetSlot,
    pub filters: FilterSession,
    pub metric: MetricSelector,
}

impl DashboardSession {
    pub fn new(bounds: DateBounds, default_window_days: i64) -> Self {
        Self {
            dataset: DatasetSlot::Pending,
            filters: FilterSession::new(bounds, default_window_days),
            metric: MetricSelector::default(),
        }
    }

    /// The session's dataset, fetching the full selectable window from
    /// `source` on first use.
    pub async fn dataset(&mut self, source: &dyn FunnelSource) -> DashResult<Arc<Vec<FunnelRecord>>> {
        match &self.dataset {
            DatasetSlot::Loaded(records) => return Ok(records.clone()),
            DatasetSlot::Failed(message) => return Err(DashboardError::Gateway(message.clone())),
            DatasetSlot::Pending => {}
        }

        let bounds = *self.filters.bounds();
        match source.fetch_funnel_records(bounds.earliest, bounds.today).await {
            Ok(records) => {
                info!(
                    source = source.name(),
                    rows = records.len(),
                    earliest = %bounds.earliest,
                    today = %bounds.today,
                    "Session dataset loaded"
                );
                let records = Arc::new(records);
                self.dataset = DatasetSlot::Loaded(records.clone());
                Ok(records)
            }
            Err(e) => {
                error!(source = source.name(), error = %e, "Session dataset fetch failed");
                metrics::counter!("dashboard.gateway_failures").increment(1);
                let message = match e {
                    DashboardError::Gateway(message) => message,
                    other => other.to_string(),
                };
                self.dataset = DatasetSlot::Failed(message.clone());
                Err(DashboardError::Gateway(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use funnel_core::RawFunnelRow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl FunnelSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_funnel_records(
            &self,
            start: NaiveDate,
            end: NaiveDate,
        ) -> DashResult<Vec<FunnelRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DashboardError::Gateway("warehouse unreachable".into()));
            }
            let row = RawFunnelRow {
                date: start.to_string(),
                ..Default::default()
            };
            let mut records = vec![FunnelRecord::from_raw(&row)?];
            records[0].date = end;
            Ok(records)
        }
    }

    fn session() -> DashboardSession {
        let today = NaiveDate::from_ymd_opt(2023, 10, 31).unwrap();
        DashboardSession::new(DateBounds::new(today, 365), 30)
    }

    #[tokio::test]
    async fn test_dataset_fetched_once_per_session() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let mut s = session();
        let first = s.dataset(&source).await.unwrap();
        let second = s.dataset(&source).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first[0].date, NaiveDate::from_ymd_opt(2023, 10, 31).unwrap());
    }

    #[tokio::test]
    async fn test_gateway_failure_blocks_the_session() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let mut s = session();
        assert!(matches!(s.dataset(&source).await, Err(DashboardError::Gateway(_))));
        assert!(matches!(s.dataset(&source).await, Err(DashboardError::Gateway(m)) if m == "warehouse unreachable"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(s.dataset, DatasetSlot::Failed(_)));
    }

    #[test]
    fn test_new_session_defaults() {
        let s = session();
        assert!(matches!(s.dataset, DatasetSlot::Pending));
        assert_eq!(s.metric, MetricSelector::Appointments);
        assert!(!s.filters.has_pending());
    }
}
