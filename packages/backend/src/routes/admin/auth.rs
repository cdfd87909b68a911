use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::services::admin_auth::{self, AdminAuthError, AdminSession};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

/// Public: exchanging the password is how a session starts.
pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    match admin_auth::admin_login(&state.config().admin, &payload.password) {
        Ok(data) => {
            tracing::info!("Admin signed in");
            Ok(Json(SuccessResponse { success: true, data }))
        }
        Err(AdminAuthError::InvalidCredentials) => {
            tracing::warn!("Admin sign-in rejected");
            Err(AppError::unauthorized("Invalid password"))
        }
        Err(AdminAuthError::NotConfigured | AdminAuthError::MissingSecret) => Err(
            AppError::service_unavailable("Admin access is not configured"),
        ),
        Err(err) => Err(AppError::internal(err.to_string())),
    }
}

pub(super) async fn session(Extension(session): Extension<AdminSession>) -> impl IntoResponse {
    Json(SuccessResponse {
        success: true,
        data: session,
    })
}
