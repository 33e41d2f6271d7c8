//! Identifier utilities.
//!
//! Two kinds of identifier are used by the content manager:
//!
//! - [`ContentToken`]: the name stem of a stored content file. Tokens are generated fresh for
//!   every upload and are never derived from user input, so two uploads can never collide on
//!   disk and an uploaded filename can never steer where bytes land.
//! - [`EntityId`]: the external identifier clients use to reference a stored file. The HTTP
//!   layer mints these as `uuid:<hyphenated v4>`, but the store indexes any non-empty value
//!   supplied by a caller.
//!
//! ## Canonical token form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the same value you would get from `Uuid::new_v4().simple().to_string()`.

mod service;

pub use service::{ContentToken, ENTITY_ID_PREFIX, EntityId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
