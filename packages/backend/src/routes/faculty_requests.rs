use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use review_core::ValidationErrors;

use crate::models::NewFacultyRequest;
use crate::response::AppError;
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 200;
const MAX_MESSAGE_LENGTH: usize = 1000;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create))
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    faculty_name: String,
    major_name: Option<String>,
    email: Option<String>,
    message: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Anonymous request to add a faculty or major to the catalog.
async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut errors = ValidationErrors::new();
    let faculty_name = payload.faculty_name.trim().to_string();
    if faculty_name.is_empty() {
        errors.push("faculty_name", "is required");
    } else if faculty_name.chars().count() > MAX_NAME_LENGTH {
        errors.push("faculty_name", format!("must be at most {MAX_NAME_LENGTH} characters"));
    }
    let email = non_blank(payload.email);
    if email.as_deref().is_some_and(|e| !e.contains('@')) {
        errors.push("email", "is not a valid email address");
    }
    let message = non_blank(payload.message);
    if message
        .as_deref()
        .is_some_and(|m| m.chars().count() > MAX_MESSAGE_LENGTH)
    {
        errors.push("message", format!("must be at most {MAX_MESSAGE_LENGTH} characters"));
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let data = state
        .store()
        .insert_faculty_request(NewFacultyRequest {
            faculty_name,
            major_name: non_blank(payload.major_name),
            email,
            message,
        })
        .await?;
    tracing::info!(request_id = %data.id, "Faculty request received");

    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true, data })))
}
