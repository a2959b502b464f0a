use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

/// Abstraction over attachment byte storage. The database keeps an opaque
/// `blob_ref`; only the store knows how to resolve it.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return the blob reference to persist.
    async fn put(&self, filename: &str, bytes: &[u8]) -> io::Result<String>;

    async fn get(&self, blob_ref: &str) -> io::Result<Vec<u8>>;

    async fn delete(&self, blob_ref: &str) -> io::Result<()>;
}

/// Filesystem-backed store. Blob refs are `<uuid>/<filename>` so the
/// original name survives for download responses.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, blob_ref: &str) -> io::Result<PathBuf> {
        // Blob refs come from our own database, but reject traversal anyway.
        if blob_ref.contains("..") || Path::new(blob_ref).is_absolute() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid blob reference: {}", blob_ref),
            ));
        }
        Ok(self.root.join(blob_ref))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, filename: &str, bytes: &[u8]) -> io::Result<String> {
        let blob_ref = format!("{}/{}", Uuid::new_v4(), filename);
        let path = self.resolve(&blob_ref)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(blob_ref)
    }

    async fn get(&self, blob_ref: &str) -> io::Result<Vec<u8>> {
        let path = self.resolve(blob_ref)?;
        tokio::fs::read(&path).await
    }

    async fn delete(&self, blob_ref: &str) -> io::Result<()> {
        let path = self.resolve(blob_ref)?;
        tokio::fs::remove_file(&path).await?;
        // Best effort: drop the now-empty uuid directory.
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::remove_dir(parent).await;
        }
        Ok(())
    }
}
