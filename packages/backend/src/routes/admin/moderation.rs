use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use review_core::ModerationStatus;

use crate::models::ReportTarget;
use crate::response::AppError;
use crate::services::moderation::{self, TagOverride};
use crate::services::files;
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
        .route("/overview", get(overview))
        .route("/pending-tags", get(list_pending_tags))
        .route("/pending-tags/:id/approve", post(approve_tag))
        .route("/pending-tags/:id/reject", post(reject_tag))
        .route("/survival-guides", get(list_guides))
        .route("/survival-guides/:id/approve", post(approve_guide))
        .route("/survival-guides/:id/reject", post(reject_guide))
        .route("/files/pending", get(pending_files))
        .route("/files/:id/approve", post(approve_file))
        .route("/files/:id/reject", post(reject_file))
        .route("/reviews", get(all_reviews))
        .route("/reviews/troll", get(troll_reviews))
        .route("/reviews/:id", delete(delete_review))
        .route("/reports/reviews", get(review_reports))
        .route("/reports/files", get(file_reports))
}

#[derive(Debug, Default, Deserialize)]
struct StatusQuery {
    status: Option<ModerationStatus>,
}

async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = moderation::overview(state.store(), state.config().troll_vote_threshold).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

// ==================== Tag suggestions ====================

async fn list_pending_tags(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::list_pending_tags(state.store(), query.status).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn approve_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<TagOverride>>,
) -> Result<impl IntoResponse, AppError> {
    let overrides = payload.map(|Json(o)| o).unwrap_or_default();
    let data = moderation::approve_pending_tag(state.store(), id, overrides).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn reject_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::reject_pending_tag(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

// ==================== Survival guides ====================

async fn list_guides(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::list_survival_guides(state.store(), query.status).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn approve_guide(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::approve_survival_guide(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn reject_guide(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::reject_survival_guide(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

// ==================== Files ====================

async fn pending_files(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = files::pending_files(state.store()).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn approve_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = files::approve_file(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn reject_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = files::reject_file(state.store(), state.storage(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

// ==================== Reviews ====================

async fn all_reviews(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = moderation::all_reviews(state.store()).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrollQuery {
    min_votes: Option<u32>,
}

async fn troll_reviews(
    State(state): State<AppState>,
    Query(query): Query<TrollQuery>,
) -> Result<impl IntoResponse, AppError> {
    let threshold = query
        .min_votes
        .unwrap_or(state.config().troll_vote_threshold)
        .max(1);
    let data = moderation::troll_reviews(state.store(), threshold).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    moderation::admin_delete_review(state.store(), id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Review deleted",
    }))
}

// ==================== Reports ====================

async fn review_reports(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = moderation::list_reports(state.store(), ReportTarget::Review).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn file_reports(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = moderation::list_reports(state.store(), ReportTarget::File).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}
