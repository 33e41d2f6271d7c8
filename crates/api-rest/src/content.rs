//! Content endpoints, mounted under the configured path (default `/content`).

use axum::{
    body::Body,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
        rejection::PathRejection,
    },
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use futures_util::TryStreamExt;
use std::io;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::{ApiError, AppState};
use api_shared::{ContentItem, ErrorRes, UploadRes};
use tinycm_core::{ContentService, Meta};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
const DEFAULT_TRANSFER_ENCODING: &str = "7bit";
const CACHE_FOREVER: &str = "public, max-age=31536000, immutable";
const ORIGINAL_FILENAME: &str = "x-original-filename";

/// Presents a record to clients. `include_path` exposes the storage path (listings only).
fn to_item(content: &ContentService, meta: Meta, include_path: bool) -> ContentItem {
    let url = meta
        .entity_id
        .as_deref()
        .map(|id| content.content_url(id))
        .unwrap_or_default();
    ContentItem {
        url,
        entity_id: meta.entity_id,
        content_path: include_path.then(|| meta.content_path.to_string_lossy().into_owned()),
        mime_type: meta.mime_type,
        encoding: meta.encoding,
        file_name: meta.file_name,
    }
}

#[utoipa::path(
    post,
    path = "/content",
    request_body(
        content = String,
        description = "One or more file parts",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Files stored", body = UploadRes),
        (status = 400, description = "No files, or the body is not valid multipart", body = ErrorRes)
    )
)]
/// Store every file part of a multipart body
///
/// Each file part is streamed straight to disk under a new entity ID. Non-file form fields
/// are ignored. A part that fails to store is logged and left out of `items`. The request
/// fails when no part was stored or the body is not valid multipart; parts stored before a
/// parse error stay in the store.
#[axum::debug_handler]
pub(crate) async fn upload_content(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadRes>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(Some(e.body_text())))?;
    let mut items = Vec::new();
    let mut failures = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                if !items.is_empty() {
                    tracing::warn!(
                        "Malformed multipart body after {} stored file(s): {}",
                        items.len(),
                        e
                    );
                }
                return Err(ApiError::BadRequest(Some(e.body_text())));
            }
        };

        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_owned();
        let encoding = field
            .headers()
            .get("content-transfer-encoding")
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_TRANSFER_ENCODING)
            .to_owned();

        let stream = field.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()));
        let reader = Box::pin(StreamReader::new(stream));

        match state
            .content
            .upload(reader, &file_name, &encoding, &mime_type)
            .await
        {
            Ok(meta) => items.push(to_item(&state.content, meta, false)),
            Err(e) => {
                tracing::warn!("Upload of {} failed: {}", file_name, e);
                failures.push(e.to_string());
            }
        }
    }

    if items.is_empty() {
        let detail = failures
            .into_iter()
            .next()
            .unwrap_or_else(|| "No files were uploaded".into());
        return Err(ApiError::BadRequest(Some(detail)));
    }

    Ok(Json(UploadRes {
        status_code: StatusCode::OK.as_u16(),
        items,
    }))
}

#[utoipa::path(
    get,
    path = "/content",
    responses(
        (status = 200, description = "Every stored item", body = [ContentItem])
    )
)]
/// List everything in the store
#[axum::debug_handler]
pub(crate) async fn list_content(State(state): State<AppState>) -> Json<Vec<ContentItem>> {
    let items = state
        .content
        .list()
        .into_iter()
        .map(|meta| to_item(&state.content, meta, true))
        .collect();
    Json(items)
}

#[utoipa::path(
    get,
    path = "/content/{entity_id}",
    params(("entity_id" = String, Path, description = "Entity ID")),
    responses(
        (status = 200, description = "The stored bytes, with the uploaded MIME type", content_type = "application/octet-stream"),
        (status = 400, description = "Entity ID is not valid UTF-8", body = ErrorRes),
        (status = 404, description = "Unknown entity", body = ErrorRes)
    )
)]
/// Download the content of one entity
///
/// Responds with the stored MIME type, the original filename in `x-original-filename`, and
/// long-lived immutable caching headers.
#[axum::debug_handler]
pub(crate) async fn fetch_content(
    State(state): State<AppState>,
    entity_id: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let entity_id = entity_id_from(entity_id)?;
    let meta = state.content.find(&entity_id).ok_or(ApiError::NotFound)?;

    let file = match tokio::fs::File::open(&meta.content_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(
                "Content for {} is missing at {}",
                entity_id,
                meta.content_path.display()
            );
            return Err(ApiError::NotFound);
        }
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };
    let length = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .len();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MIME_TYPE)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_FOREVER));
    headers.insert(
        HeaderName::from_static(ORIGINAL_FILENAME),
        filename_header(&meta.file_name),
    );

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Undecodable path segments (for example invalid UTF-8) become a JSON 400.
fn entity_id_from(path: Result<Path<String>, PathRejection>) -> Result<String, ApiError> {
    path.map(|Path(entity_id)| entity_id)
        .map_err(|rej| ApiError::BadRequest(Some(rej.body_text())))
}

/// The filename as a header value, percent-encoded when it is not valid as-is.
fn filename_header(file_name: &str) -> HeaderValue {
    HeaderValue::from_str(file_name).unwrap_or_else(|_| {
        HeaderValue::from_str(&urlencoding::encode(file_name))
            .unwrap_or_else(|_| HeaderValue::from_static(""))
    })
}

#[utoipa::path(
    delete,
    path = "/content/{entity_id}",
    params(("entity_id" = String, Path, description = "Entity ID")),
    responses(
        (status = 204, description = "Deleted, or never existed"),
        (status = 400, description = "Deletion failed, or the entity ID is not valid UTF-8", body = ErrorRes)
    )
)]
/// Delete one entity
///
/// Idempotent: unknown entities also answer 204.
#[axum::debug_handler]
pub(crate) async fn delete_content(
    State(state): State<AppState>,
    entity_id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let entity_id = entity_id_from(entity_id)?;
    match state.content.remove(&entity_id).await {
        Ok(existed) => {
            if existed {
                tracing::info!("Deleted {}", entity_id);
            }
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            tracing::error!("Delete of {} failed: {}", entity_id, e);
            Err(ApiError::BadRequest(None))
        }
    }
}

/// Anything else is 404.
pub(crate) async fn not_found() -> ApiError {
    ApiError::NotFound
}
