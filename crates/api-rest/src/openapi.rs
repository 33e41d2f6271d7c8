use axum::response::Json;
use utoipa::OpenApi;

use crate::{auth, content};
use api_shared::{ContentItem, ErrorRes, HealthRes, TokenRes, UploadRes};

#[derive(OpenApi)]
#[openapi(
    info(title = "Tiny CM", description = "Minimal content management service"),
    paths(
        crate::health,
        content::list_content,
        content::upload_content,
        content::fetch_content,
        content::delete_content,
        auth::issue_token,
    ),
    components(schemas(ContentItem, ErrorRes, HealthRes, TokenRes, UploadRes))
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document.
pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
