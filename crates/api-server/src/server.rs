//! API server: HTTP routes, the metrics exporter and session upkeep.

use crate::auth;
use crate::rest::{self, AppState};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use funnel_core::config::AppConfig;
use funnel_session::{AccessGate, SessionStore};
use funnel_warehouse::FunnelSource;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the full route table over `state`.
pub fn router(state: AppState) -> Router {
    let dashboard = Router::new()
        .route("/api/v1/logout", post(rest::logout))
        .route("/api/v1/dashboard", get(rest::dashboard))
        .route("/api/v1/filters", get(rest::get_filters))
        .route("/api/v1/filters/options", get(rest::get_filter_options))
        .route("/api/v1/filters/stage", post(rest::stage_filter))
        .route("/api/v1/filters/commit", post(rest::commit_filters))
        .route("/api/v1/filters/discard", post(rest::discard_filters))
        .route("/api/v1/map-metric", put(rest::set_map_metric))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/api/v1/login", post(rest::login))
        .merge(dashboard)
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, source: Arc<dyn FunnelSource>) -> Self {
        let sessions = Arc::new(SessionStore::new(
            config.session.ttl_secs,
            config.session.max_sessions,
        ));
        let state = AppState::new(
            sessions,
            source,
            AccessGate::new(config.auth.passphrase.clone()),
            config.dashboard.clone(),
        );
        Self { config, state }
    }

    /// Start the HTTP server. Runs until the listener fails.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, source = self.state.source.name(), "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }

        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }

    /// Periodically evict idle sessions.
    pub fn spawn_session_maintenance(&self) -> tokio::task::JoinHandle<()> {
        let sessions = self.state.sessions.clone();
        let period = Duration::from_secs(self.config.session.maintenance_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = sessions.evict_expired();
                if evicted > 0 {
                    info!(evicted, active = sessions.len(), "Session maintenance");
                }
            }
        })
    }
}
