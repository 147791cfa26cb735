/// Filesystem asset store
///
/// Objects are written below a root directory, mirroring their path. Public
/// URLs are formed from a configurable base (for example `/assets` when the
/// API server serves the files itself, or a CDN origin).
///
/// # Example
///
/// ```no_run
/// use coursehub_shared::assets::{fs::FsAssetStore, AssetStore};
/// use bytes::Bytes;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FsAssetStore::new("./data/assets", "/assets");
/// store.upload("resources/1_ab12cd34_syllabus.pdf", Bytes::from_static(b"%PDF"), "application/pdf").await?;
/// # Ok(())
/// # }
/// ```

use super::{join_url, validate_path, AssetError, AssetResult, AssetStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// [`AssetStore`] writing to the local filesystem
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
    public_base: String,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        FsAssetStore {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    /// Root directory objects are written under
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> AssetResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }
}

fn map_io(path: &str, err: std::io::Error) -> AssetError {
    match err.kind() {
        ErrorKind::NotFound => AssetError::NotFound(path.to_string()),
        _ => AssetError::Backend(format!("{}: {}", path, err)),
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn upload(&self, path: &str, bytes: Bytes, _content_type: &str) -> AssetResult<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io(path, e))?;
        }

        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn fetch(&self, path: &str) -> AssetResult<Bytes> {
        let target = self.resolve(path)?;
        let contents = tokio::fs::read(&target)
            .await
            .map_err(|e| map_io(path, e))?;
        Ok(Bytes::from(contents))
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base, path)
    }

    async fn delete(&self, path: &str) -> AssetResult<()> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| map_io(path, e))
    }
}
