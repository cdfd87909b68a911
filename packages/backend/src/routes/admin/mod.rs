use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::response::AppError;
use crate::services::admin_auth::{self, AdminAuthError};
use crate::state::AppState;

pub mod auth;
mod moderation;
mod tags;

/// Everything here sits behind [`require_admin`].
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/tags", tags::router())
        .merge(moderation::router())
        .route("/session", get(auth::session))
}

fn extract_admin_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;
    auth_header
        .strip_prefix("Bearer ")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Verifies the short-lived admin token and stores the
/// [`AdminSession`](crate::services::admin_auth::AdminSession) as an extension.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_admin_token(req.headers()) else {
        return AppError::unauthorized("Missing admin token").into_response();
    };

    match admin_auth::verify_admin_jwt(&state.config().admin, &token) {
        Ok(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Err(AdminAuthError::MissingSecret) => {
            AppError::service_unavailable("Admin access is not configured").into_response()
        }
        Err(err) => {
            tracing::debug!(error = %err, "Rejected admin token");
            AppError::unauthorized("Admin session expired, please sign in again").into_response()
        }
    }
}
