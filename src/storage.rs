//! Whole-blob storage used for the static asset and the traffic logs.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
#[error("failed to {op} {}: {source}", path.display())]
pub struct StorageError {
    pub op: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl StorageError {
    fn new(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read/write capability over byte blobs addressed by a logical path.
pub trait BlobStore {
    /// Reads the whole blob.
    fn read(&self, path: &Path) -> impl Future<Output = Result<Vec<u8>, StorageError>> + Send;

    /// Appends `bytes` to the blob, creating it if needed.
    fn append(
        &self,
        path: &Path,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Replaces the blob's contents with `bytes`.
    fn overwrite(
        &self,
        path: &Path,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Filesystem-backed store. Paths are resolved against the working directory.
#[derive(Debug, Clone, Default)]
pub struct FsBlobStore;

impl FsBlobStore {
    pub fn new() -> Self {
        Self
    }

    async fn ensure_parent(path: &Path, op: &'static str) -> Result<(), StorageError> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::new(op, path, e)),
            _ => Ok(()),
        }
    }
}

impl BlobStore for FsBlobStore {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        fs::read(path)
            .await
            .map_err(|e| StorageError::new("read", path, e))
    }

    async fn append(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        Self::ensure_parent(path, "append").await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| StorageError::new("append", path, e))?;

        file.write_all(bytes)
            .await
            .map_err(|e| StorageError::new("append", path, e))?;
        file.flush()
            .await
            .map_err(|e| StorageError::new("append", path, e))
    }

    async fn overwrite(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        Self::ensure_parent(path, "overwrite").await?;

        fs::write(path, bytes)
            .await
            .map_err(|e| StorageError::new("overwrite", path, e))
    }
}

/// In-process store. Counts reads so callers can tell whether the asset
/// was ever requested.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<PathBuf, Vec<u8>>>,
    reads: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a blob, replacing any previous contents.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.lock().insert(path.into(), bytes.into());
    }

    /// Returns a copy of the blob, if present. Does not count as a read.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().get(path.as_ref()).cloned()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        // A poisoned map still holds consistent whole blobs.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlobStore for MemoryBlobStore {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.lock().get(path).cloned().ok_or_else(|| {
            StorageError::new("read", path, io::Error::from(io::ErrorKind::NotFound))
        })
    }

    async fn append(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        self.lock()
            .entry(path.to_path_buf())
            .or_default()
            .extend_from_slice(bytes);
        Ok(())
    }

    async fn overwrite(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        self.lock().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}
