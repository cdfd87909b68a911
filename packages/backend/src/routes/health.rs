use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

const STORE_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/live", get(live))
        .route("/ready", get(ready))
}

async fn root(State(state): State<AppState>) -> Response {
    let check = store_check(&state).await;
    let ok = matches!(check, StoreCheck::Connected { .. });

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        store: check.label(),
        timestamp: now_iso(),
    };

    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let response = HealthInfoResponse {
        service: "course-review-backend",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store_kind(),
        environment: std::env::var("APP_ENV")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "development".to_string()),
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
    };

    Json(response).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn ready(State(state): State<AppState>) -> Response {
    let check = store_check(&state).await;
    let (status, status_code) = match check {
        StoreCheck::Connected { .. } => ("healthy", StatusCode::OK),
        StoreCheck::Timeout => ("degraded", StatusCode::OK),
        StoreCheck::Disconnected => ("unhealthy", StatusCode::SERVICE_UNAVAILABLE),
    };

    let response = ReadinessResponse {
        status,
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        checks: ReadinessChecks {
            store: check.label(),
            store_latency_ms: match check {
                StoreCheck::Connected { latency_ms } => Some(latency_ms),
                _ => None,
            },
        },
    };

    (status_code, Json(response)).into_response()
}

#[derive(Debug, Clone, Copy)]
enum StoreCheck {
    Connected { latency_ms: u64 },
    Timeout,
    Disconnected,
}

impl StoreCheck {
    fn label(self) -> &'static str {
        match self {
            StoreCheck::Connected { .. } => "connected",
            StoreCheck::Timeout => "timeout",
            StoreCheck::Disconnected => "disconnected",
        }
    }
}

async fn store_check(state: &AppState) -> StoreCheck {
    let started = Instant::now();
    match tokio::time::timeout(STORE_CHECK_TIMEOUT, state.store().ping()).await {
        Ok(Ok(())) => StoreCheck::Connected {
            latency_ms: started.elapsed().as_millis() as u64,
        },
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Store health check failed");
            StoreCheck::Disconnected
        }
        Err(_) => StoreCheck::Timeout,
    }
}

fn system_time_iso(time: std::time::SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    store: &'static str,
    environment: String,
    start_time: String,
    uptime: u64,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Serialize)]
struct ReadinessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
    checks: ReadinessChecks,
}

#[derive(Serialize)]
struct ReadinessChecks {
    store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    store_latency_ms: Option<u64>,
}
