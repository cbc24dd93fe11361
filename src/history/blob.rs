//! Blob storage for uploaded input images
//!
//! Images are addressed by a relative key such as `history/{id}/form.png`
//! and published under `{public_base_url}/blobs/{key}`.

use crate::error::{FormcraftError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};

/// URL path prefix under which blobs are served
pub const BLOB_ROUTE_PREFIX: &str = "/blobs/";

/// Storage for binary objects addressed by relative keys
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key` and return their public URL
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String>;

    /// Read bytes stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Delete the blob stored under `key`; deleting a missing blob succeeds
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Blob store backed by a local directory
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    /// Create a store rooted at `root`, publishing URLs under `public_base_url`
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Root directory of stored blobs
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL for a key
    pub fn url_for(&self, key: &str) -> String {
        format!("{}{}{}", self.public_base_url, BLOB_ROUTE_PREFIX, key)
    }

    fn resolve(&self, key: &str) -> std::result::Result<PathBuf, FormcraftError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)))
            && !key.split('/').any(str::is_empty);
        if !valid {
            return Err(FormcraftError::Blob(format!("Invalid blob key: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                FormcraftError::Blob(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        tokio::fs::write(&path, &data).await.map_err(|e| {
            FormcraftError::Blob(format!("Failed to write {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            "Stored blob {} ({} bytes, {})",
            key,
            data.len(),
            content_type
        );
        Ok(self.url_for(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FormcraftError::Io(e).into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FormcraftError::Io(e).into()),
        }

        // Per-record directories are dropped once empty.
        if let Some(parent) = path.parent() {
            if parent != self.root {
                let _ = tokio::fs::remove_dir(parent).await;
            }
        }
        Ok(())
    }
}

/// Reduce an upload filename to `[A-Za-z0-9._-]`
///
/// # Examples
///
/// ```
/// use formcraft::history::sanitize_filename;
///
/// assert_eq!(sanitize_filename("my form (1).png"), "myform1.png");
/// assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_filename("表单"), "image");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "image".to_string()
    } else {
        cleaned
    }
}
