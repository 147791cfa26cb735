/// In-memory asset store used by tests and the development server
use super::{join_url, validate_path, AssetError, AssetResult, AssetStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Bytes,
    content_type: String,
}

/// In-memory [`AssetStore`] with switchable upload/delete failures
#[derive(Clone)]
pub struct MemoryAssetStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    public_base: String,
    fail_uploads: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new("/assets")
    }
}

impl MemoryAssetStore {
    /// Creates an empty store serving objects under `public_base`
    pub fn new(public_base: impl Into<String>) -> Self {
        MemoryAssetStore {
            objects: Arc::new(RwLock::new(HashMap::new())),
            public_base: public_base.into(),
            fail_uploads: Arc::new(AtomicBool::new(false)),
            fail_deletes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes every upload fail while set
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Makes every delete fail while set
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Returns true if an object exists at `path`
    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    /// Number of stored objects
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Content type recorded for `path`
    pub async fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(path)
            .map(|object| object.content_type.clone())
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> AssetResult<()> {
        validate_path(path)?;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AssetError::Backend("injected upload failure".to_string()));
        }

        self.objects.write().await.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn fetch(&self, path: &str) -> AssetResult<Bytes> {
        validate_path(path)?;
        self.objects
            .read()
            .await
            .get(path)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base, path)
    }

    async fn delete(&self, path: &str) -> AssetResult<()> {
        validate_path(path)?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AssetError::Backend("injected delete failure".to_string()));
        }

        match self.objects.write().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(AssetError::NotFound(path.to_string())),
        }
    }
}
