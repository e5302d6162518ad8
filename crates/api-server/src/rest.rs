//! REST API handlers for the dashboard and operational endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use funnel_core::config::DashboardConfig;
use funnel_core::{DashboardError, DateBounds, FilterEdit, FilterState, MetricSelector};
use funnel_reporting::{filter_options, run_pipeline, FilterOptions};
use funnel_session::{AccessGate, DashboardSession, SessionStore};
use funnel_warehouse::FunnelSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::auth::SessionContext;
use crate::presentation::{render_dashboard, DashboardResponse};

/// Source of "today" for date bounds. Swappable so tests can pin the date.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub source: Arc<dyn FunnelSource>,
    pub gate: Arc<AccessGate>,
    pub dashboard: DashboardConfig,
    pub today: Clock,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionStore>,
        source: Arc<dyn FunnelSource>,
        gate: AccessGate,
        dashboard: DashboardConfig,
    ) -> Self {
        Self {
            sessions,
            source,
            gate: Arc::new(gate),
            dashboard,
            today: Arc::new(|| Utc::now().date_naive()),
            start_time: Instant::now(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Arc::new(move || today);
        self
    }
}

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Library error carried to the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(pub DashboardError);

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, message) = match &self.0 {
            DashboardError::Auth(msg) => (StatusCode::UNAUTHORIZED, self.0.code(), msg.clone()),
            DashboardError::InvalidFilter(msg) => {
                (StatusCode::BAD_REQUEST, self.0.code(), msg.clone())
            }
            DashboardError::Gateway(msg) => (
                StatusCode::BAD_GATEWAY,
                self.0.code(),
                format!("Failed to load funnel data: {msg}"),
            ),
            DashboardError::Session(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.code(), msg.clone())
            }
            other => {
                error!(error = %other, "Request failed");
                metrics::counter!("api.errors").increment(1);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal processing error".to_string(),
                )
            }
        };
        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ─── Session lifecycle ──────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub earliest: NaiveDate,
    pub today: NaiveDate,
}

/// POST /api/v1/login: unlock a new dashboard session.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    state.gate.check(&request.password)?;

    let bounds = DateBounds::new((state.today)(), state.dashboard.lookback_days);
    let session = DashboardSession::new(bounds, state.dashboard.default_window_days);
    let token = state.sessions.create(session)?;
    info!(earliest = %bounds.earliest, today = %bounds.today, "Dashboard unlocked");

    Ok(Json(LoginResponse {
        token,
        earliest: bounds.earliest,
        today: bounds.today,
    }))
}

/// POST /api/v1/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> StatusCode {
    state.sessions.remove(&ctx.token);
    StatusCode::NO_CONTENT
}

// ─── Dashboard ──────────────────────────────────────────────────────────────

/// GET /api/v1/dashboard: one pipeline run over the committed filters.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> ApiResult<DashboardResponse> {
    let started = Instant::now();
    let mut session = ctx.session.lock().await;
    let dataset = session.dataset(state.source.as_ref()).await?;

    let view = run_pipeline(&dataset, session.filters.committed(), session.metric);
    let response = render_dashboard(&view);

    metrics::counter!("dashboard.renders").increment(1);
    metrics::histogram!("dashboard.render_ms").record(started.elapsed().as_secs_f64() * 1000.0);
    Ok(Json(response))
}

// ─── Filters ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct FiltersResponse {
    pub committed: FilterState,
    pub staged: FilterState,
    pub pending: bool,
    pub bounds: DateBounds,
}

fn filters_response(session: &DashboardSession) -> FiltersResponse {
    FiltersResponse {
        committed: session.filters.committed().clone(),
        staged: session.filters.staged().clone(),
        pending: session.filters.has_pending(),
        bounds: *session.filters.bounds(),
    }
}

/// GET /api/v1/filters
pub async fn get_filters(Extension(ctx): Extension<SessionContext>) -> Json<FiltersResponse> {
    let session = ctx.session.lock().await;
    Json(filters_response(&session))
}

/// GET /api/v1/filters/options: distinct values for the filter controls.
pub async fn get_filter_options(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> ApiResult<FilterOptions> {
    let mut session = ctx.session.lock().await;
    let dataset = session.dataset(state.source.as_ref()).await?;
    Ok(Json(filter_options(&dataset)))
}

/// POST /api/v1/filters/stage: edit the staged state only.
pub async fn stage_filter(
    Extension(ctx): Extension<SessionContext>,
    Json(edit): Json<FilterEdit>,
) -> ApiResult<FiltersResponse> {
    let mut session = ctx.session.lock().await;
    if let Err(e) = session.filters.stage(edit) {
        warn!(error = %e, "Rejected filter edit");
        metrics::counter!("filters.rejected").increment(1);
        return Err(e.into());
    }
    Ok(Json(filters_response(&session)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommitResponse {
    pub changed: bool,
    #[serde(flatten)]
    pub filters: FiltersResponse,
}

/// POST /api/v1/filters/commit: the "Re-run" action.
pub async fn commit_filters(
    Extension(ctx): Extension<SessionContext>,
) -> ApiResult<CommitResponse> {
    let mut session = ctx.session.lock().await;
    let changed = session.filters.commit()?;
    if changed {
        metrics::counter!("filters.commits").increment(1);
        let (start, end) = session.filters.committed().date_range();
        info!(%start, %end, "Filters committed");
    }
    Ok(Json(CommitResponse {
        changed,
        filters: filters_response(&session),
    }))
}

/// POST /api/v1/filters/discard
pub async fn discard_filters(Extension(ctx): Extension<SessionContext>) -> Json<FiltersResponse> {
    let mut session = ctx.session.lock().await;
    session.filters.discard();
    Json(filters_response(&session))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MapMetricRequest {
    pub metric: MetricSelector,
}

/// PUT /api/v1/map-metric: choose the choropleth coloring column.
pub async fn set_map_metric(
    Extension(ctx): Extension<SessionContext>,
    Json(request): Json<MapMetricRequest>,
) -> Json<MapMetricRequest> {
    let mut session = ctx.session.lock().await;
    session.metric = request.metric;
    Json(MapMetricRequest {
        metric: session.metric,
    })
}

// ─── Probes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub source: String,
    pub active_sessions: usize,
    pub uptime_secs: u64,
}

/// GET /health: Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        source: state.source.name().to_string(),
        active_sessions: state.sessions.len(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready: Readiness probe for Kubernetes.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live: Liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
