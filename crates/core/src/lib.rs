//! # Tiny CM Core
//!
//! Business logic for the content manager:
//! - Startup configuration resolved once from the environment ([`CoreConfig`])
//! - The content service that assigns entity IDs to uploads and builds client URLs
//!
//! **No HTTP concerns**: routing, multipart parsing and status codes belong in `api-rest`.

pub mod config;
pub mod constants;
pub mod error;
pub mod service;

pub use config::CoreConfig;
pub use error::{ConfigError, CoreError, CoreResult};
pub use service::ContentService;
pub use tinycm_files::{FileStore, FilesError, Meta};
pub use tinycm_uuid::EntityId;
