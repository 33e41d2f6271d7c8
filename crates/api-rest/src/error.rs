use api_shared::ErrorRes;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

/// Failures that handlers report to clients.
///
/// Every variant renders as `{ "statusCode": <code>, "message": <text> }`.
#[derive(Debug)]
pub enum ApiError {
    /// 400; the optional detail is appended to `Bad Request: `
    BadRequest(Option<String>),
    /// 403 from the stub authorization check
    Forbidden,
    /// 404 for unknown entities and unmatched paths
    NotFound,
    /// 429 once the per-minute request ceiling is reached
    TooManyRequests,
    /// 500; the detail is logged, never sent
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorRes {
        let code = self.status().as_u16();
        match self {
            ApiError::BadRequest(detail) => ErrorRes::bad_request(detail.as_deref()),
            ApiError::Forbidden => ErrorRes::new(code, "denied"),
            ApiError::NotFound => ErrorRes::not_found(),
            ApiError::TooManyRequests => ErrorRes::new(code, "Too Many Requests"),
            ApiError::Internal(_) => ErrorRes::new(code, "Internal error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!("Internal error: {}", detail);
        }
        (self.status(), Json(self.body())).into_response()
    }
}
