use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::response::AppError;
use crate::services::moderation::{self, TagInput};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/:id", put(update_tag).delete(delete_tag))
}

async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = moderation::list_tags(state.store()).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn create_tag(
    State(state): State<AppState>,
    Json(payload): Json<TagInput>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::create_tag(state.store(), payload).await?;
    tracing::info!(tag_id = %data.id, "Tag created by admin");
    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true, data })))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TagInput>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::update_tag(state.store(), id, payload).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    moderation::delete_tag(state.store(), id).await?;
    tracing::info!(tag_id = %id, "Tag deleted by admin");
    Ok(Json(MessageResponse {
        success: true,
        message: "Tag deleted",
    }))
}
