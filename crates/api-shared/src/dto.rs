//! Request and response bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRes {
    pub status_code: u16,
    pub message: String,
}

impl ErrorRes {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }

    /// A 400 whose message always starts with `Bad Request`.
    pub fn bad_request(detail: Option<&str>) -> Self {
        match detail {
            Some(detail) => Self::new(400, format!("Bad Request: {}", detail)),
            None => Self::new(400, "Bad Request"),
        }
    }
}

/// A stored item as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Link to fetch the content
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Server-side storage path; only included in listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<String>,
    pub mime_type: String,
    pub encoding: String,
    pub file_name: String,
}

/// Response to a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRes {
    pub status_code: u16,
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Token issued by the development auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenRes {
    pub token_type: String,
    pub access_token: String,
}
