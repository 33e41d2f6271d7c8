//! # API Shared
//!
//! Shared definitions for the content manager's HTTP surface.
//!
//! Contains:
//! - Wire types (`dto` module), serialised with camelCase keys
//! - Shared services like `HealthService`
//! - The stub authorization check
//!
//! Used by `api-rest` and the root binary.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{validate_authorization, AuthError};
pub use dto::{ContentItem, ErrorRes, HealthRes, TokenRes, UploadRes};
pub use health::HealthService;
