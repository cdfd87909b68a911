use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use review_core::VoteType;

use crate::auth::AuthUser;
use crate::models::ReportTarget;
use crate::response::AppError;
use crate::services::moderation::{self, ReportInput};
use crate::services::reviews::{self, ReviewInput};
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
        .route("/:id", put(update_review).delete(delete_review))
        .route("/:id/votes", post(vote))
        .route("/:id/reports", post(report))
}

async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewInput>,
) -> Result<impl IntoResponse, AppError> {
    let data = reviews::update_review(state.store(), user.id, id, payload).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    reviews::delete_review(state.store(), user.id, id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Review deleted",
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    vote_type: VoteType,
}

async fn vote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let data = reviews::toggle_vote(state.store(), user.id, id, payload.vote_type).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportInput>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::submit_report(state.store(), user.id, ReportTarget::Review, id, payload).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true, data })))
}
