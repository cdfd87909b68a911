use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::response::AppError;
use crate::services::catalog;
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/:id", get(get_instructor))
        .route("/:id/courses", get(courses))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let data = catalog::search_instructors(state.store(), &query.q, query.limit).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn get_instructor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = catalog::instructor_detail(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn courses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data =
        catalog::instructor_courses(state.store(), id, state.config().min_reviews_for_display).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}
