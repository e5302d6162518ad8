//! In-process session table backed by DashMap. Entries expire after an idle
//! TTL; a background task calls [`SessionStore::evict_expired`].

use dashmap::DashMap;
use funnel_core::{DashResult, DashboardError};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::session::DashboardSession;

const TOKEN_PREFIX: &str = "fd_";

struct SessionEntry {
    session: Arc<Mutex<DashboardSession>>,
    last_seen: Instant,
}

pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl_secs: u64, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::from_secs(ttl_secs),
            max_sessions,
        }
    }

    /// Register a session and return its bearer token.
    pub fn create(&self, session: DashboardSession) -> DashResult<String> {
        if self.sessions.len() >= self.max_sessions {
            self.evict_expired();
            if self.sessions.len() >= self.max_sessions {
                metrics::counter!("sessions.rejected").increment(1);
                return Err(DashboardError::Session(
                    "too many active sessions".to_string(),
                ));
            }
        }

        let token = generate_token();
        self.sessions.insert(
            token.clone(),
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_seen: Instant::now(),
            },
        );
        self.publish_active();
        info!(active = self.sessions.len(), "Session created");
        Ok(token)
    }

    /// Look up a live session and refresh its idle timer.
    pub fn get(&self, token: &str) -> Option<Arc<Mutex<DashboardSession>>> {
        let mut entry = self.sessions.get_mut(token)?;
        if entry.last_seen.elapsed() > self.ttl {
            drop(entry);
            if self.sessions.remove(token).is_some() {
                self.publish_active();
            }
            debug!("Expired session presented");
            return None;
        }
        entry.last_seen = Instant::now();
        Some(entry.session.clone())
    }

    pub fn remove(&self, token: &str) -> bool {
        let removed = self.sessions.remove(token).is_some();
        if removed {
            self.publish_active();
        }
        removed
    }

    /// Drop idle sessions, returning how many were removed.
    pub fn evict_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.last_seen.elapsed() <= self.ttl);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            self.publish_active();
            debug!(evicted, "Evicted idle sessions");
        }
        evicted
    }

    fn publish_active(&self) {
        metrics::gauge!("sessions.active").set(self.sessions.len() as f64);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    format!(
        "{}{}",
        TOKEN_PREFIX,
        bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use funnel_core::{DateBounds, MetricSelector};
    use metrics::{
        Counter, Gauge, GaugeFn, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
    };

    /// Records the last value set on `sessions.active`.
    #[derive(Default)]
    struct ActiveGauge(std::sync::Mutex<Option<f64>>);

    impl ActiveGauge {
        fn value(&self) -> Option<f64> {
            *self.0.lock().unwrap()
        }
    }

    impl GaugeFn for ActiveGauge {
        fn increment(&self, value: f64) {
            let mut v = self.0.lock().unwrap();
            *v = Some(v.unwrap_or(0.0) + value);
        }

        fn decrement(&self, value: f64) {
            let mut v = self.0.lock().unwrap();
            *v = Some(v.unwrap_or(0.0) - value);
        }

        fn set(&self, value: f64) {
            *self.0.lock().unwrap() = Some(value);
        }
    }

    #[derive(Default)]
    struct GaugeRecorder {
        active: Arc<ActiveGauge>,
    }

    impl Recorder for GaugeRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            Counter::noop()
        }

        fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
            if key.name() == "sessions.active" {
                Gauge::from_arc(self.active.clone())
            } else {
                Gauge::noop()
            }
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    fn session() -> DashboardSession {
        let today = NaiveDate::from_ymd_opt(2023, 10, 31).unwrap();
        DashboardSession::new(DateBounds::new(today, 365), 30)
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = SessionStore::new(3600, 10);
        let token = store.create(session()).unwrap();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), TOKEN_PREFIX.len() + 64);

        let handle = store.get(&token).unwrap();
        handle.lock().await.metric = MetricSelector::Cost;
        let again = store.get(&token).unwrap();
        assert_eq!(again.lock().await.metric, MetricSelector::Cost);

        assert!(store.get("fd_unknown").is_none());
        assert!(store.remove(&token));
        assert!(store.get(&token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_tokens_are_unique() {
        let store = SessionStore::new(3600, 10);
        let a = store.create(session()).unwrap();
        let b = store.create(session()).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_zero_ttl_expires_sessions() {
        let store = SessionStore::new(0, 10);
        let token = store.create(session()).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.get(&token).is_none());
        assert!(store.is_empty());

        store.create(session()).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.evict_expired(), 1);
    }

    #[test]
    fn test_expired_lookup_updates_active_gauge() {
        let recorder = GaugeRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            let store = SessionStore::new(0, 10);
            let token = store.create(session()).unwrap();
            assert_eq!(recorder.active.value(), Some(1.0));
            std::thread::sleep(Duration::from_millis(5));
            assert!(store.get(&token).is_none());
        });
        assert_eq!(recorder.active.value(), Some(0.0));
    }

    #[test]
    fn test_capacity_limit() {
        let store = SessionStore::new(3600, 1);
        store.create(session()).unwrap();
        assert!(matches!(
            store.create(session()),
            Err(DashboardError::Session(_))
        ));
    }
}
