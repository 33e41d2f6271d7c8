//! Optional static front end served from `GUI_DIR`.

use axum::{
    extract::Request,
    handler::HandlerWithoutStateExt,
    http::header,
    response::{IntoResponse, Response},
    routing::{MethodRouter, any_service},
};
use std::path::{Path, PathBuf};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::ApiError;

const INDEX_FILE: &str = "index.html";

/// Static files from `dir`, with `index.html` answering unknown paths for browsers.
///
/// Returns `None` when no directory is configured or it has no `index.html`.
pub(crate) fn gui_service(dir: Option<&Path>) -> Option<MethodRouter> {
    let Some(dir) = dir else {
        tracing::debug!("No GUI directory configured.");
        return None;
    };
    let index = dir.join(INDEX_FILE);
    if !index.is_file() {
        tracing::debug!("No GUI served: {} not found", index.display());
        return None;
    }
    tracing::info!("Serving GUI from {}", dir.display());

    let spa = move |req: Request| spa_fallback(index.clone(), req);
    let files = ServeDir::new(dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(spa.into_service());
    Some(any_service(files))
}

/// Browsers get the app shell for client-side routes; API clients get a JSON 404.
async fn spa_fallback(index: PathBuf, req: Request) -> Response {
    let wants_html = req
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("html"));
    if !wants_html {
        return ApiError::NotFound.into_response();
    }
    match ServeFile::new(index).oneshot(req).await {
        Ok(res) => res.into_response(),
        Err(e) => ApiError::Internal(e.to_string()).into_response(),
    }
}
