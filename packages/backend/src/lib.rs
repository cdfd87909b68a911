//! Course review backend: catalog browsing, reviews, votes, uploads and the
//! moderation panel, served over HTTP with axum.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod store;

use std::sync::Arc;

use tower_http::services::ServeDir;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{Config, StorageBackend};
use crate::state::AppState;
use crate::store::{ContentStore, MemoryStore};

/// Local uploads are served from here when the `local` storage backend is used.
pub const LOCAL_UPLOADS_PATH: &str = "/uploads";

/// Full router with tracing and CORS.
pub fn build_app(state: AppState) -> axum::Router {
    let uploads = match state.config().storage.backend {
        StorageBackend::Local => Some(state.config().storage.dir.clone()),
        _ => None,
    };

    let mut app = routes::router(state);
    if let Some(dir) = uploads {
        app = app.nest_service(LOCAL_UPLOADS_PATH, ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Connects the configured content store: PostgreSQL when `DATABASE_URL` is
/// set, otherwise an empty in-process store.
pub async fn connect_store() -> Result<(Arc<dyn ContentStore>, &'static str), db::DbInitError> {
    if std::env::var("DATABASE_URL").map_or(true, |v| v.trim().is_empty()) {
        tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
        let store: Arc<dyn ContentStore> = Arc::new(MemoryStore::new());
        return Ok((store, "memory"));
    }
    let store: Arc<dyn ContentStore> = db::PgStore::from_env().await?;
    tracing::info!("Connected to PostgreSQL");
    Ok((store, "postgres"))
}

#[derive(Debug, thiserror::Error)]
pub enum AppInitError {
    #[error("database: {0}")]
    Database(#[from] db::DbInitError),
    #[error("object storage: {0}")]
    Storage(#[from] storage::StorageError),
}

/// Builds the application from environment configuration.
pub async fn create_app(config: Config) -> Result<axum::Router, AppInitError> {
    let (store, store_kind) = connect_store().await?;
    let storage = storage::build(&config.storage)?;
    let state = AppState::new(config, store, storage, store_kind);
    Ok(build_app(state))
}
