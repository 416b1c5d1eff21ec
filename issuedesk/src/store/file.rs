//! File-backed record store
//!
//! The whole store lives in one JSON snapshot, rewritten (temp file, then
//! rename) on every commit that wrote something, so a crash mid-write leaves
//! the previous snapshot intact.
//!
//! Several processes may share one snapshot. Every transaction takes an
//! exclusive lock on the `<snapshot>.lock` sidecar and re-reads the snapshot
//! under it, and keeps the lock until it commits or is dropped.

use super::memory::StoreFaults;
use super::tables::{read_snapshot, sidecar_path, write_snapshot, LockedTransaction, Tables};
use super::{RecordStore, StoreTransaction};
use crate::error::{IssueDeskError, Result};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Exclusive advisory lock on a store's sidecar file, released on drop
#[derive(Debug)]
pub(crate) struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Block until the lock for the snapshot at `snapshot` is ours
    async fn acquire(snapshot: &Path) -> Result<Self> {
        let path = sidecar_path(snapshot, "lock");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let lock_path = path.clone();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| IssueDeskError::storage(format!("store lock task failed: {}", e)))?
        .map_err(|e| {
            IssueDeskError::storage(format!("failed to lock store {}: {}", path.display(), e))
        })?;

        debug!("Locked store {}", path.display());
        Ok(Self { file, path })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock store {}: {}", self.path.display(), e);
        }
    }
}

/// Where a transaction persists its commit, and the lock that makes it safe
#[derive(Debug)]
pub(crate) struct SnapshotFile {
    pub(crate) path: PathBuf,
    #[allow(dead_code)]
    pub(crate) lock: StoreLock,
}

/// Record store persisted as a JSON snapshot
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
    tables: Arc<Mutex<Tables>>,
}

async fn load(path: &Path) -> Result<Tables> {
    read_snapshot(path).await.map_err(|e| match e {
        IssueDeskError::Json(err) => IssueDeskError::storage(format!(
            "store file {} is corrupt: {}",
            path.display(),
            err
        )),
        other => other,
    })
}

impl FileRecordStore {
    /// Open the snapshot at `path`; a missing file is an empty store
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = load(&path).await?;
        debug!(
            "Opened store {} with {} issues and {} activity entries",
            path.display(),
            tables.issues().len(),
            tables.activity().len()
        );
        Ok(Self {
            path,
            tables: Arc::new(Mutex::new(tables)),
        })
    }

    /// Create an empty snapshot file; refuses to overwrite an existing one
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        {
            let _lock = StoreLock::acquire(path).await?;
            if tokio::fs::try_exists(path).await? {
                return Err(IssueDeskError::conflict(format!(
                    "store file {} already exists",
                    path.display()
                )));
            }
            write_snapshot(path, &Tables::default()).await?;
        }
        info!("Created store {}", path.display());
        Self::open(path).await
    }

    /// Take both the in-process and the cross-process lock, then reload the snapshot
    async fn lock(&self) -> Result<(OwnedMutexGuard<Tables>, StoreLock)> {
        let mut tables = self.tables.clone().lock_owned().await;
        let lock = StoreLock::acquire(&self.path).await?;
        *tables = load(&self.path).await?;
        Ok((tables, lock))
    }

    /// Discard every record, keeping the file
    pub async fn reset(&self) -> Result<()> {
        let (mut tables, _lock) = self.lock().await?;
        write_snapshot(&self.path, &Tables::default()).await?;
        *tables = Tables::default();
        info!("Reset store {}", self.path.display());
        Ok(())
    }

    /// Location of the snapshot
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the records currently committed to the file
    pub async fn snapshot(&self) -> Result<Tables> {
        let (tables, _lock) = self.lock().await?;
        Ok(tables.clone())
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let (tables, lock) = self.lock().await?;
        Ok(Box::new(LockedTransaction::new(
            tables,
            StoreFaults::default(),
            Some(SnapshotFile {
                path: self.path.clone(),
                lock,
            }),
        )))
    }
}
