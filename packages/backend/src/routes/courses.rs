use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::response::AppError;
use crate::services::files::UploadRequest;
use crate::services::grades::GradeSubmission;
use crate::services::reviews::ReviewInput;
use crate::services::{catalog, files, grades, moderation, reviews};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/:id", get(get_course))
        .route("/:id/stats", get(stats))
        .route("/:id/reviews", get(list_reviews).post(create_review))
        .route("/:id/reviews/mine", get(my_review))
        .route("/:id/files", get(list_files).post(upload_file))
        .route(
            "/:id/grade-distributions",
            get(list_distributions).post(submit_distribution),
        )
        .route("/:id/grade-boundaries", get(grade_boundaries))
        .route("/:id/grade-timeline", get(grade_timeline))
        .route("/:id/survival-guides", post(submit_guide))
        .route("/:id/survival-guides/mine", get(my_guides))
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
    let data = catalog::search_courses(state.store(), &query.q, query.limit).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = catalog::course_detail(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = catalog::course_stats(state.store(), id, state.config().min_reviews_for_display).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

// ==================== Reviews ====================

async fn list_reviews(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = reviews::course_reviews(state.store(), id, viewer.map(|u| u.id)).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewInput>,
) -> Result<impl IntoResponse, AppError> {
    let data = reviews::create_review(state.store(), user.id, id, payload).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true, data })))
}

async fn my_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = reviews::my_review(state.store(), user.id, id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

// ==================== Files ====================

async fn list_files(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = files::course_files(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let data = files::upload(
        state.store(),
        state.storage(),
        state.config().max_upload_bytes,
        user.id,
        id,
        payload,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true, data })))
}

// ==================== Grades ====================

async fn list_distributions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = grades::list_distributions(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn submit_distribution(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<GradeSubmission>,
) -> Result<impl IntoResponse, AppError> {
    let data = grades::submit_distribution(state.store(), user.id, id, payload).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true, data })))
}

#[derive(Debug, Deserialize)]
struct BoundariesQuery {
    year: Option<i32>,
}

async fn grade_boundaries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<BoundariesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let data = grades::grade_boundaries(
        state.store(),
        id,
        query.year,
        state.config().min_reviews_for_display,
    )
    .await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn grade_timeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = grades::grade_timeline(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

// ==================== Survival guides ====================

#[derive(Debug, Deserialize)]
struct GuideRequest {
    content: String,
}

async fn submit_guide(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<GuideRequest>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::submit_survival_guide(state.store(), user.id, id, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true, data })))
}

async fn my_guides(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = moderation::my_survival_guides(state.store(), user.id, id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}
