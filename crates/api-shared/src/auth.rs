/// Reasons a request fails the authorization check.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    Missing,
}

/// Completely fake authorization: any non-blank `Authorization` header value is accepted.
///
/// This is a development stand-in for a real identity provider and performs no validation
/// of the credential itself.
pub fn validate_authorization(header: Option<&str>) -> Result<(), AuthError> {
    match header {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(AuthError::Missing),
    }
}
