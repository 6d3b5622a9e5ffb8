use async_trait::async_trait;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::store::{StoreSnapshot, WorkOrderStore};
use crate::work_order::ValidationError;

/// Errors that can occur while saving or loading store snapshots
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Snapshot rejected: {0}")]
    InvalidSnapshot(#[from] ValidationError),
}

/// Where store snapshots live between process runs
#[async_trait]
pub trait SnapshotPersistence {
    /// Persist the snapshot, replacing any previous one
    async fn save_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), PersistenceError>;

    /// Load the last snapshot, `None` if nothing was saved yet
    async fn load_snapshot(&self) -> Result<Option<StoreSnapshot>, PersistenceError>;
}

/// Exclusive lock on a `.lock` file next to a snapshot. Processes that load,
/// change and save the same snapshot must hold it for the whole sequence.
pub struct SnapshotLock {
    path: PathBuf,
    lock: RwLock<File>,
}

impl SnapshotLock {
    pub fn open(snapshot_path: &Path) -> Result<Self, PersistenceError> {
        let mut name = snapshot_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store.json".into());
        name.push(".lock");
        let path = snapshot_path.with_file_name(name);
        std::fs::create_dir_all(parent_dir(&path))?;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;
        Ok(Self {
            path,
            lock: RwLock::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until every other holder has released the lock
    pub fn acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>, PersistenceError> {
        let guard = self.lock.write()?;
        debug!(path = %self.path.display(), "Snapshot lock acquired");
        Ok(guard)
    }

    /// Take the lock only if nobody else holds it
    pub fn try_acquire(&mut self) -> Option<RwLockWriteGuard<'_, File>> {
        self.lock.try_write().ok()
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

// Each writer gets its own temp file in the target directory, so concurrent
// saves never clobber each other's partial output.
fn write_replacing(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Pretty-printed JSON file, replaced atomically through a temp file and rename
pub struct FileSnapshotPersistence {
    path: PathBuf,
}

impl FileSnapshotPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the lock that serializes processes sharing this snapshot
    pub fn lock(&self) -> Result<SnapshotLock, PersistenceError> {
        SnapshotLock::open(&self.path)
    }
}

#[async_trait]
impl SnapshotPersistence for FileSnapshotPersistence {
    async fn save_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_replacing(&path, json.as_bytes()))
            .await
            .map_err(std::io::Error::other)??;

        debug!(
            path = %self.path.display(),
            orders = snapshot.orders.len(),
            "Snapshot saved"
        );
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Option<StoreSnapshot>, PersistenceError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No snapshot yet, starting empty");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// Load a store through `persistence`, or an empty one if nothing was saved
pub async fn load_store<P>(persistence: &P) -> Result<WorkOrderStore, PersistenceError>
where
    P: SnapshotPersistence + Sync + ?Sized,
{
    match persistence.load_snapshot().await? {
        Some(snapshot) => Ok(WorkOrderStore::from_snapshot(snapshot)?),
        None => Ok(WorkOrderStore::new()),
    }
}

pub async fn save_store<P>(persistence: &P, store: &WorkOrderStore) -> Result<(), PersistenceError>
where
    P: SnapshotPersistence + Sync + ?Sized,
{
    persistence.save_snapshot(&store.snapshot()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work_order::{Admission, WorkOrderDraft, WorkOrderId};

    #[test]
    fn test_missing_file_loads_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FileSnapshotPersistence::new(dir.path().join("none.json"));

        let store = tokio_test::block_on(load_store(&persistence)).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FileSnapshotPersistence::new(dir.path().join("nested/store.json"));

        let store = WorkOrderStore::new();
        let draft = WorkOrderDraft::new("Pole swap", 40.0, -74.0, 12.5).unwrap();
        store.insert(draft, Admission::pending()).unwrap();

        tokio_test::block_on(async {
            save_store(&persistence, &store).await.unwrap();
            let restored = load_store(&persistence).await.unwrap();
            assert_eq!(restored.list(), store.list());
            assert_eq!(restored.snapshot().next_id, 2);
        });

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("store.json")]);
    }

    #[test]
    fn test_snapshot_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FileSnapshotPersistence::new(dir.path().join("store.json"));

        let mut first = persistence.lock().unwrap();
        let mut second = persistence.lock().unwrap();
        assert_eq!(first.path(), dir.path().join("store.json.lock"));

        let guard = first.acquire().unwrap();
        assert!(second.try_acquire().is_none());
        drop(guard);
        assert!(second.try_acquire().is_some());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        let persistence = FileSnapshotPersistence::new(&path);
        let result = tokio_test::block_on(load_store(&persistence));
        assert!(matches!(result, Err(PersistenceError::SerializationError(_))));
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FileSnapshotPersistence::new(dir.path().join("store.json"));

        let store = WorkOrderStore::new();
        let draft = WorkOrderDraft::new("Pole swap", 40.0, -74.0, 12.5).unwrap();
        store.insert(draft, Admission::pending()).unwrap();
        let mut snapshot = store.snapshot();
        snapshot.orders.push(snapshot.orders[0].clone());
        snapshot.orders[1].id = WorkOrderId(1);

        let result = tokio_test::block_on(async {
            persistence.save_snapshot(&snapshot).await.unwrap();
            load_store(&persistence).await
        });
        assert!(matches!(result, Err(PersistenceError::InvalidSnapshot(_))));
    }
}
