//! Bearer token middleware for the dashboard routes.
//!
//! A token is issued by `/api/v1/login` once the passphrase matches. Every
//! other dashboard route resolves it to a live session here.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use funnel_session::DashboardSession;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::rest::{AppState, ErrorResponse};

/// The resolved session, attached to the request as an extension.
#[derive(Clone)]
pub struct SessionContext {
    pub token: String,
    pub session: Arc<Mutex<DashboardSession>>,
}

fn unauthorized(error: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let Some(token) = token else {
        return unauthorized(
            "missing_auth",
            "Authorization header with Bearer token required",
        );
    };

    match state.sessions.get(&token) {
        Some(session) => {
            req.extensions_mut().insert(SessionContext { token, session });
            next.run(req).await
        }
        None => {
            debug!("Unknown or expired session token");
            unauthorized("invalid_token", "Invalid or expired session token")
        }
    }
}
