//! The metadata store.
//!
//! [`FileStore`] coordinates two pieces of state:
//!
//! - content files in the data directory, written as uploads stream in, and
//! - the in-memory metadata index, snapshotted to `metadata.json`.
//!
//! # Consistency
//!
//! - A record is inserted only after its content file has been fully written and synced.
//! - A failed upload removes its partial file and leaves the index untouched.
//! - Index mutations happen under a short, synchronous lock that is never held across an
//!   `.await`, so the index is consistent between any two suspension points.
//! - Concurrent operations on the *same* entity ID are not coordinated. A delete racing a
//!   create for one caller-supplied ID may remove the newer record.
//!
//! # Persistence
//!
//! The index carries a dirty flag. [`FileStore::save`] writes only when the flag is set or the
//! write is forced, and clears the flag whether or not the write succeeds. A failing disk
//! therefore produces one logged error per mutation burst rather than one per autosave tick.
//!
//! # Lifecycle
//!
//! Call [`FileStore::init`] once at startup and [`FileStore::flush`] once at shutdown. `init`
//! may arm an autosave task; `flush` stops it, waits for any write it has in flight, and forces
//! a final write.
//!
//! Snapshot writes are serialised: each save takes the index under the save lock and holds the
//! lock until its rename completes, so the newest payload is always the last one on disk.

use crate::constants::{METADATA_FILE_NAME, SNAPSHOT_TEMP_SUFFIX};
use crate::{FilesError, FilesResult, Meta, MetaMap};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tinycm_uuid::ContentToken;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

/// Index entries plus the flag recording unsaved changes.
#[derive(Debug, Default)]
struct Index {
    entries: MetaMap,
    dirty: bool,
}

/// The running autosave task and the token that stops it.
#[derive(Debug)]
struct Autosave {
    token: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct Inner {
    data_dir: PathBuf,
    snapshot_path: PathBuf,
    index: Mutex<Index>,
    /// Held from serialisation until the snapshot rename completes.
    save_lock: tokio::sync::Mutex<()>,
    autosave: Mutex<Option<Autosave>>,
}

/// Store for uploaded content and its metadata
///
/// Cloning is cheap; clones share the same index and autosave task.
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

impl FileStore {
    /// Creates a store rooted at `data_dir`, with its snapshot at `data_dir/metadata.json`.
    ///
    /// No I/O happens until [`FileStore::init`].
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let snapshot_path = data_dir.join(METADATA_FILE_NAME);
        Self::with_snapshot_path(data_dir, snapshot_path)
    }

    /// Creates a store with an explicit snapshot location.
    pub fn with_snapshot_path(data_dir: impl Into<PathBuf>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                data_dir: data_dir.into(),
                snapshot_path: snapshot_path.into(),
                index: Mutex::new(Index::default()),
                save_lock: tokio::sync::Mutex::new(()),
                autosave: Mutex::new(None),
            }),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.inner.snapshot_path
    }

    /// Returns true if the index has changes not yet written to the snapshot.
    pub fn is_dirty(&self) -> bool {
        self.inner.index.lock().dirty
    }

    /// Returns true while a periodic autosave task is running.
    pub fn autosave_armed(&self) -> bool {
        self.inner.autosave.lock().is_some()
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.inner.index.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads the index from disk and optionally arms autosave.
    ///
    /// Creates the data directory and an empty snapshot when they are missing.
    /// `save_seconds == 0` disables autosave.
    ///
    /// Call at most once per process. A second call reloads the snapshot and replaces the
    /// running autosave task.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the data directory cannot be created (I/O)
    /// - the snapshot cannot be read
    /// - the snapshot is not a valid index
    pub async fn init(&self, save_seconds: u64) -> FilesResult<()> {
        let data_dir = self.data_dir();
        if !fs::try_exists(data_dir).await? {
            fs::create_dir_all(data_dir).await?;
            tracing::info!("Created {}.", data_dir.display());
        }

        let snapshot_path = self.snapshot_path();
        if !fs::try_exists(snapshot_path).await? {
            self.save(true).await;
            tracing::info!("Created {}.", snapshot_path.display());
        }

        let raw = fs::read(snapshot_path)
            .await
            .map_err(FilesError::SnapshotRead)?;
        let entries: MetaMap = serde_json::from_slice(&raw).map_err(FilesError::SnapshotParse)?;
        let count = entries.len();
        {
            let mut index = self.inner.index.lock();
            index.entries = entries;
            index.dirty = false;
        }
        tracing::debug!("Read {} keys from store.", count);

        if save_seconds > 0 {
            self.arm_autosave(Duration::from_secs(save_seconds));
        }

        Ok(())
    }

    /// Streams `reader` to a new content file and indexes the resulting record.
    ///
    /// `file_name` only contributes its extension to the stored file's name. The record is
    /// indexed only when `entity_id` is present and non-empty; otherwise it is returned to the
    /// caller but cannot be found later.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the content file cannot be created or the copy fails. The
    /// partial file is removed and the index is left untouched.
    pub async fn create<R>(
        &self,
        mut reader: R,
        file_name: &str,
        encoding: &str,
        mime_type: &str,
        entity_id: Option<&str>,
    ) -> FilesResult<Meta>
    where
        R: AsyncRead + Unpin,
    {
        let token = ContentToken::new();
        let content_path = self
            .data_dir()
            .join(token.file_name(&extension_of(file_name)));

        let meta = Meta {
            entity_id: entity_id.map(str::to_owned),
            content_path,
            mime_type: mime_type.to_owned(),
            encoding: encoding.to_owned(),
            file_name: file_name.to_owned(),
        };

        if let Err(err) = copy_to_file(&mut reader, &meta.content_path).await {
            remove_partial(&meta.content_path).await;
            return Err(err);
        }

        Ok(self.update(meta))
    }

    /// Looks up a record. Never touches the disk.
    pub fn find(&self, entity_id: &str) -> Option<Meta> {
        self.inner.index.lock().entries.get(entity_id).cloned()
    }

    /// Returns a snapshot of every indexed record.
    pub fn list(&self) -> Vec<Meta> {
        self.inner.index.lock().entries.values().cloned().collect()
    }

    /// Removes a record and its content file.
    ///
    /// Unknown IDs are a no-op. A content file that is already gone does not prevent the index
    /// entry from being removed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::Io` if the content file exists but cannot be removed. The index
    /// entry is kept in that case.
    pub async fn delete(&self, entity_id: &str) -> FilesResult<()> {
        let Some(meta) = self.find(entity_id) else {
            return Ok(());
        };

        match fs::remove_file(&meta.content_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    "Content for {} was already missing at {}.",
                    entity_id,
                    meta.content_path.display()
                );
            }
            Err(e) => return Err(FilesError::Io(e)),
        }

        let mut index = self.inner.index.lock();
        if index.entries.remove(entity_id).is_some() {
            index.dirty = true;
        }
        Ok(())
    }

    /// Inserts or replaces a record and marks the index dirty.
    ///
    /// Records without a usable entity ID are returned unchanged and not indexed.
    pub fn update(&self, meta: Meta) -> Meta {
        if let Some(key) = meta.index_key() {
            let mut index = self.inner.index.lock();
            index.entries.insert(key.to_owned(), meta.clone());
            index.dirty = true;
        }
        meta
    }

    /// Writes the index to the snapshot file if it is dirty or `force` is set.
    ///
    /// Failures are logged, not returned. The dirty flag is cleared either way, so the next
    /// attempt happens after the next mutation.
    pub async fn save(&self, force: bool) {
        let _guard = self.inner.save_lock.lock().await;
        let payload = {
            let mut index = self.inner.index.lock();
            if !(index.dirty || force) {
                return;
            }
            index.dirty = false;
            serde_json::to_vec(&index.entries)
        };

        let result = match payload {
            Ok(bytes) => write_snapshot(self.snapshot_path(), &bytes).await,
            Err(e) => Err(FilesError::Serialization(e)),
        };

        if let Err(e) = result {
            tracing::error!(
                "Failed to write \"{}\".\n{}",
                self.snapshot_path().display(),
                e
            );
        }
    }

    /// Stops autosave, waits for its in-flight write, and forces a final snapshot write.
    ///
    /// Safe to call any number of times.
    pub async fn flush(&self) {
        let autosave = self.inner.autosave.lock().take();
        if let Some(autosave) = autosave {
            autosave.token.cancel();
            if let Err(e) = autosave.task.await {
                tracing::error!("Autosave task failed: {}", e);
            }
        }

        self.save(true).await;
    }

    fn arm_autosave(&self, period: Duration) {
        let token = CancellationToken::new();
        let store = self.clone();
        let cancelled = token.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => store.save(false).await,
                }
            }
            tracing::debug!("Autosave stopped.");
        });

        let previous = self.inner.autosave.lock().replace(Autosave { token, task });
        if let Some(previous) = previous {
            previous.token.cancel();
        }
    }
}

/// Returns the extension of `file_name` with its leading dot, or an empty string.
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

async fn copy_to_file<R>(reader: &mut R, path: &Path) -> FilesResult<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = fs::File::create(path).await?;
    let written = tokio::io::copy(reader, &mut file)
        .await
        .map_err(FilesError::Stream)?;
    file.flush().await.map_err(FilesError::Stream)?;
    file.sync_all().await.map_err(FilesError::Stream)?;
    Ok(written)
}

/// Best-effort removal of a partially written content file.
async fn remove_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed incomplete file {}.", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "Failed to remove incomplete file {}: {}",
            path.display(),
            e
        ),
    }
}

/// Writes the snapshot beside its final location, then renames it into place.
async fn write_snapshot(path: &Path, bytes: &[u8]) -> FilesResult<()> {
    let mut temp: OsString = path.as_os_str().to_owned();
    temp.push(SNAPSHOT_TEMP_SUFFIX);
    let temp = PathBuf::from(temp);

    fs::write(&temp, bytes).await?;
    if let Err(e) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(FilesError::Io(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;
    use tokio::io::ReadBuf;

    /// Yields some bytes, then fails, like a client disconnecting mid-upload.
    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "kaboom",
                )));
            }
            self.sent = true;
            buf.put_slice(b"partial upload");
            Poll::Ready(Ok(()))
        }
    }

    /// Seeds a data directory with one content file and a snapshot indexing it.
    fn seed(dir: &Path) -> PathBuf {
        let content_path = dir.join("uuid812.txt");
        std::fs::write(&content_path, "THIS IS A TEST FILE").unwrap();

        let mut map = MetaMap::new();
        map.insert(
            "uuid812".into(),
            Meta {
                entity_id: Some("uuid812".into()),
                content_path: content_path.clone(),
                mime_type: "text/plain".into(),
                encoding: "utf-8".into(),
                file_name: "test-file.txt".into(),
            },
        );
        std::fs::write(
            dir.join(METADATA_FILE_NAME),
            serde_json::to_vec(&map).unwrap(),
        )
        .unwrap();

        content_path
    }

    async fn seeded_store() -> (TempDir, PathBuf, FileStore) {
        let temp = TempDir::new().unwrap();
        let content_path = seed(temp.path());
        let store = FileStore::new(temp.path());
        store.init(0).await.unwrap();
        (temp, content_path, store)
    }

    fn data_dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.txt"), ".txt");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("test-string"), "");
        assert_eq!(extension_of(".bashrc"), "");
        assert_eq!(extension_of("../../etc/passwd.png"), ".png");
        assert_eq!(extension_of(""), "");
    }

    #[test]
    fn test_new_uses_default_snapshot_name() {
        let store = FileStore::new("/app/data");

        assert_eq!(store.data_dir(), Path::new("/app/data"));
        assert_eq!(store.snapshot_path(), Path::new("/app/data/metadata.json"));
        assert!(store.is_empty());
        assert!(!store.is_dirty());
        assert!(!store.autosave_armed());
    }

    #[tokio::test]
    async fn test_init_loads_existing_snapshot() {
        let (_temp, content_path, store) = seeded_store().await;

        assert_eq!(store.len(), 1);
        assert!(!store.is_dirty());
        assert_eq!(
            store.list(),
            vec![Meta {
                entity_id: Some("uuid812".into()),
                content_path,
                mime_type: "text/plain".into(),
                encoding: "utf-8".into(),
                file_name: "test-file.txt".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_init_creates_directory_and_snapshot() {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("nested").join("data");

        let store = FileStore::new(&data_dir);
        store.init(0).await.unwrap();

        assert!(data_dir.is_dir());
        assert_eq!(
            std::fs::read_to_string(data_dir.join(METADATA_FILE_NAME)).unwrap(),
            "{}"
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_init_rejects_malformed_snapshot() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(METADATA_FILE_NAME), "{ not json").unwrap();

        let store = FileStore::new(temp.path());
        let result = store.init(0).await;

        assert!(matches!(result, Err(FilesError::SnapshotParse(_))));
    }

    #[tokio::test]
    async fn test_init_fails_when_snapshot_cannot_be_created() {
        let temp = TempDir::new().unwrap();
        let snapshot = temp.path().join("missing").join(METADATA_FILE_NAME);

        let store = FileStore::with_snapshot_path(temp.path(), snapshot);
        let result = store.init(0).await;

        assert!(matches!(result, Err(FilesError::SnapshotRead(_))));
    }

    #[tokio::test]
    async fn test_create_returns_metadata() {
        let (temp, _content_path, store) = seeded_store().await;

        let meta = store
            .create(&b"test-string"[..], "test-string", "utf-8", "text/plain", None)
            .await
            .unwrap();

        assert_eq!(meta.file_name, "test-string");
        assert_eq!(meta.mime_type, "text/plain");
        assert_eq!(meta.encoding, "utf-8");
        assert_eq!(meta.content_path.parent(), Some(temp.path()));
        assert_eq!(std::fs::read(&meta.content_path).unwrap(), b"test-string");
    }

    #[tokio::test]
    async fn test_create_without_entity_id_is_not_indexed() {
        let (_temp, _content_path, store) = seeded_store().await;

        let meta = store
            .create(&b"orphan"[..], "orphan.txt", "utf-8", "text/plain", None)
            .await
            .unwrap();

        assert!(meta.entity_id.is_none());
        assert_eq!(store.len(), 1);
        assert!(!store.is_dirty());
        assert!(store.list().iter().all(|m| m.content_path != meta.content_path));
    }

    #[tokio::test]
    async fn test_create_then_find() {
        let (_temp, _content_path, store) = seeded_store().await;
        let payload: Vec<u8> = (0..=255).cycle().take(200_000).collect();

        let meta = store
            .create(
                payload.as_slice(),
                "blob.bin",
                "binary",
                "application/octet-stream",
                Some("blob"),
            )
            .await
            .unwrap();

        let found = store.find("blob").unwrap();
        assert_eq!(found, meta);
        assert_eq!(found.encoding, "binary");
        assert_eq!(found.mime_type, "application/octet-stream");
        assert_eq!(found.file_name, "blob.bin");
        assert!(found.content_path.to_string_lossy().ends_with(".bin"));
        assert_eq!(std::fs::read(&found.content_path).unwrap(), payload);
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn test_create_never_uses_uploaded_name_for_path() {
        let (temp, _content_path, store) = seeded_store().await;

        let meta = store
            .create(&b"x"[..], "../../escape.txt", "7bit", "text/plain", Some("e"))
            .await
            .unwrap();

        assert_eq!(meta.content_path.parent(), Some(temp.path()));
        let stem = meta.content_path.file_stem().unwrap().to_str().unwrap();
        assert_eq!(stem.len(), 32);
        assert!(stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        assert_eq!(meta.file_name, "../../escape.txt");
    }

    #[tokio::test]
    async fn test_create_same_name_twice_uses_distinct_paths() {
        let (_temp, _content_path, store) = seeded_store().await;

        let a = store
            .create(&b"one"[..], "same.txt", "7bit", "text/plain", Some("a"))
            .await
            .unwrap();
        let b = store
            .create(&b"two"[..], "same.txt", "7bit", "text/plain", Some("b"))
            .await
            .unwrap();

        assert_ne!(a.content_path, b.content_path);
        assert_eq!(std::fs::read(&a.content_path).unwrap(), b"one");
        assert_eq!(std::fs::read(&b.content_path).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_create_cleans_up_incomplete_file() {
        let (temp, _content_path, store) = seeded_store().await;
        let before = data_dir_entries(temp.path());

        let result = store
            .create(
                FailingReader { sent: false },
                "broken.txt",
                "utf-8",
                "text/plain",
                Some("broken"),
            )
            .await;

        assert!(matches!(result, Err(FilesError::Stream(_))));
        assert_eq!(data_dir_entries(temp.path()), before);
        assert!(store.find("broken").is_none());
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_create_fails_when_data_dir_missing() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("never-created"));

        let result = store
            .create(&b"x"[..], "a.txt", "7bit", "text/plain", Some("a"))
            .await;

        assert!(matches!(result, Err(FilesError::Io(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_entry() {
        let (_temp, content_path, store) = seeded_store().await;

        store.delete("uuid812").await.unwrap();

        assert!(store.find("uuid812").is_none());
        assert!(!content_path.exists());
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn test_delete_twice_is_idempotent() {
        let (_temp, _content_path, store) = seeded_store().await;

        store.delete("uuid812").await.unwrap();
        store.delete("uuid812").await.unwrap();

        assert!(store.find("uuid812").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_noop() {
        let (_temp, _content_path, store) = seeded_store().await;

        store.delete("guid812").await.unwrap();
        store.delete("guid812").await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_delete_with_missing_content_still_removes_entry() {
        let (_temp, content_path, store) = seeded_store().await;
        std::fs::remove_file(&content_path).unwrap();

        store.delete("uuid812").await.unwrap();

        assert!(store.find("uuid812").is_none());
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn test_delete_keeps_entry_when_unlink_fails() {
        let (temp, _content_path, store) = seeded_store().await;
        let dir_path = temp.path().join("not-a-file");
        std::fs::create_dir(&dir_path).unwrap();
        store.update(Meta {
            entity_id: Some("dir".into()),
            content_path: dir_path,
            mime_type: "text/plain".into(),
            encoding: "7bit".into(),
            file_name: "dir".into(),
        });

        let result = store.delete("dir").await;

        assert!(matches!(result, Err(FilesError::Io(_))));
        assert!(store.find("dir").is_some());
    }

    #[tokio::test]
    async fn test_update_requires_entity_id() {
        let (_temp, content_path, store) = seeded_store().await;
        let meta = Meta {
            entity_id: Some(String::new()),
            content_path,
            mime_type: "text/plain".into(),
            encoding: "7bit".into(),
            file_name: "x.txt".into(),
        };

        let returned = store.update(meta.clone());

        assert_eq!(returned, meta);
        assert_eq!(store.len(), 1);
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_update_replaces_whole_record() {
        let (_temp, content_path, store) = seeded_store().await;
        let replacement = Meta {
            entity_id: Some("uuid812".into()),
            content_path,
            mime_type: "text/markdown".into(),
            encoding: "8bit".into(),
            file_name: "renamed.md".into(),
        };

        store.update(replacement.clone());

        assert_eq!(store.find("uuid812"), Some(replacement));
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn test_save_without_changes_does_not_write() {
        let (_temp, _content_path, store) = seeded_store().await;
        std::fs::remove_file(store.snapshot_path()).unwrap();

        store.save(false).await;

        assert!(!store.snapshot_path().exists());
    }

    #[tokio::test]
    async fn test_save_without_changes_keeps_content() {
        let (_temp, _content_path, store) = seeded_store().await;
        let before = std::fs::read(store.snapshot_path()).unwrap();
        let modified = std::fs::metadata(store.snapshot_path())
            .unwrap()
            .modified()
            .unwrap();

        store.save(false).await;

        assert_eq!(std::fs::read(store.snapshot_path()).unwrap(), before);
        assert_eq!(
            std::fs::metadata(store.snapshot_path())
                .unwrap()
                .modified()
                .unwrap(),
            modified
        );
    }

    #[tokio::test]
    async fn test_save_when_dirty_writes_and_clears_flag() {
        let (_temp, _content_path, store) = seeded_store().await;
        store
            .create(&b"hi"[..], "hi.txt", "7bit", "text/plain", Some("hi"))
            .await
            .unwrap();

        store.save(false).await;

        assert!(!store.is_dirty());
        let raw = std::fs::read(store.snapshot_path()).unwrap();
        let map: MetaMap = serde_json::from_slice(&raw).unwrap();
        assert!(map.contains_key("hi"));
        assert!(map.contains_key("uuid812"));
    }

    #[tokio::test]
    async fn test_save_force_writes_when_clean() {
        let (_temp, _content_path, store) = seeded_store().await;
        std::fs::remove_file(store.snapshot_path()).unwrap();

        store.save(true).await;

        let raw = std::fs::read(store.snapshot_path()).unwrap();
        let map: MetaMap = serde_json::from_slice(&raw).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_clears_dirty_flag() {
        let temp = TempDir::new().unwrap();
        let snapshot = temp.path().join("missing").join(METADATA_FILE_NAME);
        let store = FileStore::with_snapshot_path(temp.path(), &snapshot);
        store.update(Meta {
            entity_id: Some("a".into()),
            content_path: temp.path().join("a.txt"),
            mime_type: "text/plain".into(),
            encoding: "7bit".into(),
            file_name: "a.txt".into(),
        });
        assert!(store.is_dirty());

        store.save(false).await;

        assert!(!store.is_dirty());
        assert!(!snapshot.exists());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        store.init(0).await.unwrap();
        for i in 0..5 {
            store
                .create(
                    format!("content {}", i).as_bytes(),
                    &format!("file-{}.txt", i),
                    "7bit",
                    "text/plain",
                    Some(format!("id{}", i).as_str()),
                )
                .await
                .unwrap();
        }
        store.flush().await;

        let reloaded = FileStore::new(temp.path());
        reloaded.init(0).await.unwrap();

        assert_eq!(reloaded.list(), store.list());
        assert_eq!(reloaded.len(), 5);
        assert!(!temp
            .path()
            .join(format!("{}{}", METADATA_FILE_NAME, SNAPSHOT_TEMP_SUFFIX))
            .exists());
    }

    #[tokio::test]
    async fn test_flush_is_idempotent_and_stops_autosave() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        store.init(60).await.unwrap();
        assert!(store.autosave_armed());

        store.flush().await;
        assert!(!store.autosave_armed());

        store.flush().await;
        assert!(!store.autosave_armed());
        assert!(store.snapshot_path().exists());
    }

    #[tokio::test]
    async fn test_flush_without_autosave() {
        let (_temp, _content_path, store) = seeded_store().await;
        store.delete("uuid812").await.unwrap();

        store.flush().await;

        let raw = std::fs::read(store.snapshot_path()).unwrap();
        let map: MetaMap = serde_json::from_slice(&raw).unwrap();
        assert!(map.is_empty());
        assert!(!store.is_dirty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_flush_wins_over_concurrent_save() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        store.init(0).await.unwrap();

        for round in 0..50 {
            for i in 0..20 {
                store.update(Meta {
                    entity_id: Some(format!("id{}-{}", round, i)),
                    content_path: temp.path().join(format!("gone{}-{}.txt", round, i)),
                    mime_type: "text/plain".into(),
                    encoding: "7bit".into(),
                    file_name: "gone.txt".into(),
                });
            }

            let racing = store.clone();
            let pending = tokio::spawn(async move { racing.save(false).await });
            for meta in store.list() {
                let id = meta.entity_id.unwrap();
                store.delete(&id).await.unwrap();
            }
            store.flush().await;
            pending.await.unwrap();

            let raw = std::fs::read(store.snapshot_path()).unwrap();
            let map: MetaMap = serde_json::from_slice(&raw).unwrap();
            assert_eq!(map.len(), store.len(), "stale snapshot in round {}", round);
        }
    }

    #[tokio::test]
    async fn test_flush_waits_for_running_autosave() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        store.init(1).await.unwrap();
        store.update(Meta {
            entity_id: Some("late".into()),
            content_path: temp.path().join("late.txt"),
            mime_type: "text/plain".into(),
            encoding: "7bit".into(),
            file_name: "late.txt".into(),
        });

        tokio::time::sleep(Duration::from_millis(1000)).await;
        store.delete("late").await.unwrap();
        store.flush().await;

        let raw = std::fs::read(store.snapshot_path()).unwrap();
        let map: MetaMap = serde_json::from_slice(&raw).unwrap();
        assert!(map.is_empty());
        assert!(!store.autosave_armed());
    }

    #[tokio::test]
    async fn test_autosave_writes_dirty_index() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        store.init(1).await.unwrap();

        store
            .create(&b"tick"[..], "tick.txt", "7bit", "text/plain", Some("tick"))
            .await
            .unwrap();

        let mut saved = false;
        for _ in 0..30 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let raw = std::fs::read(store.snapshot_path()).unwrap();
            let map: MetaMap = serde_json::from_slice(&raw).unwrap();
            if map.contains_key("tick") {
                saved = true;
                break;
            }
        }

        assert!(saved, "autosave did not persist the new record");
        assert!(!store.is_dirty());
        store.flush().await;
    }

    #[tokio::test]
    async fn test_second_init_replaces_autosave() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        store.init(60).await.unwrap();
        store.init(60).await.unwrap();

        assert!(store.autosave_armed());
        store.flush().await;
        assert!(!store.autosave_armed());
    }

    #[tokio::test]
    async fn test_hello_scenario() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        store.init(0).await.unwrap();

        let meta = store
            .create(&b"hello"[..], "a.txt", "utf-8", "text/plain", Some("id1"))
            .await
            .unwrap();

        assert_eq!(meta.entity_id.as_deref(), Some("id1"));
        assert_eq!(meta.file_name, "a.txt");
        assert_eq!(meta.mime_type, "text/plain");
        assert_eq!(meta.encoding, "utf-8");
        assert_eq!(meta.content_path.parent(), Some(temp.path()));
        assert_eq!(
            meta.content_path.extension().and_then(|e| e.to_str()),
            Some("txt")
        );
        assert_eq!(store.find("id1"), Some(meta.clone()));
        assert_eq!(std::fs::read_to_string(&meta.content_path).unwrap(), "hello");

        store.delete("id1").await.unwrap();

        assert!(store.find("id1").is_none());
        assert!(!meta.content_path.exists());
    }
}
