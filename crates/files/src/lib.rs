//! Content storage for the tiny content manager.
//!
//! This crate owns the mapping between external entity IDs and the files holding their bytes.
//!
//! ## Storage Model
//!
//! Everything lives in a single data directory:
//!
//! ```text
//! <data_dir>/
//! ├── metadata.json                         # snapshot of the metadata index
//! ├── 550e8400e29b41d4a716446655440000.txt  # one file per stored entity
//! └── 6f1c2d0e8a7b4c3d9e0f1a2b3c4d5e6f.png
//! ```
//!
//! - Content files are named from a freshly generated token plus the uploaded file's
//!   extension. Uploaded filenames are kept for display only.
//! - The metadata index is held in memory and written to `metadata.json` on a timer (when it
//!   has changed) and on shutdown.
//! - A record only enters the index once its bytes are fully on disk.
//!
//! ## Example Usage
//!
//! ```no_run
//! use tinycm_files::FileStore;
//!
//! # async fn run() -> Result<(), tinycm_files::FilesError> {
//! let store = FileStore::new("/app/data");
//! store.init(60).await?;
//!
//! let meta = store
//!     .create(&b"hello"[..], "a.txt", "7bit", "text/plain", Some("id1"))
//!     .await?;
//! assert_eq!(store.find("id1"), Some(meta));
//!
//! store.delete("id1").await?;
//! store.flush().await;
//! # Ok(())
//! # }
//! ```

mod constants;
mod meta;
mod store;

pub use constants::{METADATA_FILE_NAME, SNAPSHOT_TEMP_SUFFIX};
pub use meta::{Meta, MetaMap};
pub use store::FileStore;
pub use tinycm_uuid::ContentToken;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Copying an upload to disk failed part way through
    #[error("failed to stream content to disk: {0}")]
    Stream(std::io::Error),

    /// The metadata snapshot exists but could not be read
    #[error("failed to read metadata snapshot: {0}")]
    SnapshotRead(std::io::Error),

    /// The metadata snapshot is not a valid index
    #[error("failed to parse metadata snapshot: {0}")]
    SnapshotParse(serde_json::Error),

    /// The index could not be serialised
    #[error("failed to serialise metadata index: {0}")]
    Serialization(serde_json::Error),
}

pub type FilesResult<T> = Result<T, FilesError>;
