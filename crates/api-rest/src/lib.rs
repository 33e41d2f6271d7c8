//! # API REST
//!
//! REST API implementation for the content manager.
//!
//! Handles:
//! - HTTP endpoints with axum (content upload, listing, download, deletion)
//! - OpenAPI documentation
//! - REST-specific concerns (JSON serialisation, CORS, compression, rate limiting)
//!
//! Uses `api-shared` for wire types and `tinycm-core` for content operations.

#![warn(rust_2018_idioms)]

mod auth;
mod content;
mod error;
mod gui;
mod middleware;
mod openapi;


use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    middleware::from_fn_with_state,
    response::Json,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use api_shared::{HealthRes, HealthService};
use tinycm_core::{ContentService, CoreConfig, FileStore};

pub use error::ApiError;
pub use openapi::ApiDoc;

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    content: ContentService,
}

impl AppState {
    /// Builds state around an already initialised store.
    pub fn new(cfg: Arc<CoreConfig>, store: FileStore) -> Self {
        let content = ContentService::new(cfg.clone(), store);
        Self { cfg, content }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn content(&self) -> &ContentService {
        &self.content
    }
}

/// Builds the complete application router.
///
/// Content endpoints are nested under the configured mount path. Health, OpenAPI and the
/// development token endpoint live at fixed paths. When a GUI directory is configured it
/// answers every other path.
///
/// Every request counts against a per-minute budget keyed on the client address, which is
/// read from `ConnectInfo<SocketAddr>`; serve with `into_make_service_with_connect_info`.
pub fn build_router(state: AppState) -> Router {
    let cfg = state.cfg.clone();

    let content = Router::new()
        .route(
            "/",
            get(content::list_content).post(content::upload_content),
        )
        .route(
            "/:entity_id",
            get(content::fetch_content).delete(content::delete_content),
        )
        .fallback(content::not_found)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::require_authorization,
        ));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .route(
            "/auth/realms/:realm/protocol/openid-connect/token",
            post(auth::issue_token),
        )
        .nest(cfg.mount_path(), content)
        .with_state(state);

    match gui::gui_service(cfg.gui_dir()) {
        Some(gui) => app = app.fallback_service(gui),
        None => app = app.fallback(content::not_found),
    }

    app.layer(DefaultBodyLimit::max(cfg.max_upload_bytes()))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(
            middleware::client_limiter(cfg.max_requests_per_minute()),
            middleware::limit_per_client,
        ))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}
