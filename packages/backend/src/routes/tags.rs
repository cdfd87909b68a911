use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::response::AppError;
use crate::services::moderation::{self, TagSuggestion};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/suggestions", post(suggest))
}

async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = moderation::list_tags(state.store()).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

/// New tags only appear after an admin approves the suggestion.
async fn suggest(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TagSuggestion>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::suggest_tag(state.store(), user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true, data })))
}
