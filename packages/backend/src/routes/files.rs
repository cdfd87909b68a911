use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::ReportTarget;
use crate::response::AppError;
use crate::services::moderation::{self, ReportInput};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/:id/reports", post(report))
}

async fn report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportInput>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::submit_report(state.store(), user.id, ReportTarget::File, id, payload).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true, data })))
}
