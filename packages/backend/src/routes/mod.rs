mod admin;
mod courses;
mod faculties;
mod faculty_requests;
mod files;
mod health;
mod instructors;
mod reviews;
mod tags;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

/// Uploads arrive base64-encoded inside JSON.
fn body_limit(max_upload_bytes: u64) -> usize {
    let encoded = max_upload_bytes.saturating_mul(4) / 3;
    usize::try_from(encoded.saturating_add(64 * 1024)).unwrap_or(usize::MAX)
}

pub fn router(state: AppState) -> Router {
    let middleware_state = state.clone();
    let body_limit = body_limit(state.config().max_upload_bytes);

    let mut app = Router::new();

    app = app.nest("/api/faculties", faculties::router());
    app = app.nest("/api/faculty-requests", faculty_requests::router());
    app = app.nest("/api/courses", courses::router());
    app = app.nest("/api/instructors", instructors::router());
    app = app.nest("/api/reviews", reviews::router());
    app = app.nest("/api/files", files::router());
    app = app.nest("/api/tags", tags::router());

    app = app.nest("/api/admin/auth", admin::auth::router());
    app = app.nest(
        "/api/admin",
        admin::router().layer(middleware::from_fn_with_state(
            middleware_state,
            admin::require_admin,
        )),
    );

    app = app.nest("/health", health::router());

    app.layer(DefaultBodyLimit::max(body_limit))
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
