//! Content operations used by the HTTP layer.

use crate::{CoreConfig, CoreResult};
use std::sync::Arc;
use tinycm_files::{FileStore, Meta};
use tinycm_uuid::EntityId;
use tokio::io::AsyncRead;

/// Pure content operations - no HTTP concerns
///
/// Every upload is given a freshly minted [`EntityId`], so records created through this
/// service are always indexed.
#[derive(Clone, Debug)]
pub struct ContentService {
    cfg: Arc<CoreConfig>,
    store: FileStore,
}

impl ContentService {
    pub fn new(cfg: Arc<CoreConfig>, store: FileStore) -> Self {
        Self { cfg, store }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Stores one uploaded file under a new entity ID.
    ///
    /// # Errors
    /// Returns [`crate::CoreError::Files`] if streaming the content to disk fails.
    pub async fn upload<R>(
        &self,
        reader: R,
        file_name: &str,
        encoding: &str,
        mime_type: &str,
    ) -> CoreResult<Meta>
    where
        R: AsyncRead + Unpin,
    {
        let entity_id = EntityId::generate();
        let meta = self
            .store
            .create(reader, file_name, encoding, mime_type, Some(entity_id.as_str()))
            .await?;
        tracing::debug!("Stored {} as {}", file_name, entity_id);
        Ok(meta)
    }

    pub fn find(&self, entity_id: &str) -> Option<Meta> {
        self.store.find(entity_id)
    }

    pub fn list(&self) -> Vec<Meta> {
        self.store.list()
    }

    /// Deletes an entity if it exists.
    ///
    /// Returns whether the entity was present.
    pub async fn remove(&self, entity_id: &str) -> CoreResult<bool> {
        if self.store.find(entity_id).is_none() {
            return Ok(false);
        }
        self.store.delete(entity_id).await?;
        Ok(true)
    }

    /// Client-facing URL for an entity: `<mount_path>/<percent-encoded id>`.
    pub fn content_url(&self, entity_id: &str) -> String {
        format!(
            "{}/{}",
            self.cfg.mount_path(),
            urlencoding::encode(entity_id)
        )
    }
}
