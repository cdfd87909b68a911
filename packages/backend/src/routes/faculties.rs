use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::response::AppError;
use crate::services::catalog::{self, CourseFilter, CourseSort, SortOrder};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_faculties))
        .route("/top-level", get(top_level))
        .route("/:id", get(get_faculty))
        .route("/:id/children", get(children))
        .route("/:id/courses", get(courses))
        .route("/:id/instructors", get(instructors))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    #[serde(default)]
    hide_empty: bool,
}

async fn list_faculties(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let data = catalog::list_faculties(state.store(), query.hide_empty).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn top_level(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let data = catalog::top_level_faculties(state.store()).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn get_faculty(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = catalog::faculty_detail(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn children(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = catalog::faculty_children(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoursesQuery {
    search: Option<String>,
    course_type: Option<String>,
    class_type: Option<String>,
    semester: Option<i32>,
    instructor: Option<String>,
    has_reviews: Option<bool>,
    sort: Option<CourseSort>,
    order: Option<SortOrder>,
}

async fn courses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CoursesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = CourseFilter {
        search: query.search,
        course_type: query.course_type.filter(|v| !v.is_empty()),
        class_type: query.class_type.filter(|v| !v.is_empty()),
        semester: query.semester,
        instructor: query.instructor,
        has_reviews: query.has_reviews,
        sort: query.sort.unwrap_or_default(),
        order: query.order.unwrap_or_default(),
    };
    let data = catalog::faculty_courses(
        state.store(),
        id,
        filter,
        state.config().min_reviews_for_display,
    )
    .await?;
    Ok(Json(SuccessResponse { success: true, data }))
}

async fn instructors(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let data = catalog::faculty_instructors(state.store(), id).await?;
    Ok(Json(SuccessResponse { success: true, data }))
}
