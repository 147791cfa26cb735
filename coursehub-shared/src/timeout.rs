/// Bounded timeouts for collaborator calls
///
/// Every call to the document store or the asset store goes through one of
/// the wrappers in this module, so a hung backend surfaces as
/// `StoreError::Timeout` / `AssetError::Timeout` instead of stalling a request.
///
/// # Limits
///
/// - Default: 10 seconds
/// - Minimum: 100 milliseconds
/// - Maximum: 5 minutes
///
/// # Example
///
/// ```
/// use coursehub_shared::store::{memory::MemoryStore, DocumentStore};
/// use coursehub_shared::timeout::{CallTimeout, TimedStore};
/// use std::sync::Arc;
///
/// let inner: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
/// let store = TimedStore::new(inner, CallTimeout::from_millis(Some(2_000)));
/// ```

use crate::assets::{AssetError, AssetResult, AssetStore};
use crate::store::{BatchOp, Document, DocumentStore, Filter, Patch, Record, StoreError, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Default call timeout (10 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum allowed call timeout (100 milliseconds)
pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Maximum allowed call timeout (5 minutes)
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Validated per-call timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeout(Duration);

impl Default for CallTimeout {
    fn default() -> Self {
        CallTimeout(DEFAULT_TIMEOUT)
    }
}

impl CallTimeout {
    /// Creates a timeout, clamped to the allowed range
    pub fn new(duration: Duration) -> Self {
        CallTimeout(duration.clamp(MIN_TIMEOUT, MAX_TIMEOUT))
    }

    /// Creates a timeout from configured milliseconds (None = default)
    pub fn from_millis(millis: Option<u64>) -> Self {
        match millis {
            Some(ms) => Self::new(Duration::from_millis(ms)),
            None => Self::default(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    async fn run<T, E, F>(&self, call: F, on_timeout: impl FnOnce(Duration) -> E) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.0, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = self.0.as_millis() as u64, "Collaborator call timed out");
                Err(on_timeout(self.0))
            }
        }
    }
}

/// [`DocumentStore`] wrapper applying a [`CallTimeout`] to every call
#[derive(Clone)]
pub struct TimedStore {
    inner: Arc<dyn DocumentStore>,
    timeout: CallTimeout,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, timeout: CallTimeout) -> Self {
        TimedStore { inner, timeout }
    }
}

#[async_trait]
impl DocumentStore for TimedStore {
    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<Record>> {
        self.timeout
            .run(self.inner.query(collection, filters), StoreError::Timeout)
            .await
    }

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Record>> {
        self.timeout
            .run(self.inner.get(collection, id), StoreError::Timeout)
            .await
    }

    async fn create(&self, collection: &str, data: Document) -> StoreResult<Uuid> {
        self.timeout
            .run(self.inner.create(collection, data), StoreError::Timeout)
            .await
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Patch) -> StoreResult<()> {
        self.timeout
            .run(self.inner.update(collection, id, patch), StoreError::Timeout)
            .await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> StoreResult<()> {
        self.timeout
            .run(self.inner.delete(collection, id), StoreError::Timeout)
            .await
    }

    /// Runs the batch under the call timeout
    ///
    /// The deadline covers the commit too. A commit still in flight when it
    /// expires may land anyway, so `StoreError::Timeout` here does not mean
    /// nothing was written. Callers re-read before retrying; a repeated
    /// review transition resolves to a no-op.
    async fn atomic_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        self.timeout
            .run(self.inner.atomic_batch(ops), StoreError::Timeout)
            .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.timeout.run(self.inner.ping(), StoreError::Timeout).await
    }
}

/// [`AssetStore`] wrapper applying a [`CallTimeout`] to every call
#[derive(Clone)]
pub struct TimedAssetStore {
    inner: Arc<dyn AssetStore>,
    timeout: CallTimeout,
}

impl TimedAssetStore {
    pub fn new(inner: Arc<dyn AssetStore>, timeout: CallTimeout) -> Self {
        TimedAssetStore { inner, timeout }
    }
}

#[async_trait]
impl AssetStore for TimedAssetStore {
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> AssetResult<()> {
        self.timeout
            .run(self.inner.upload(path, bytes, content_type), AssetError::Timeout)
            .await
    }

    async fn fetch(&self, path: &str) -> AssetResult<Bytes> {
        self.timeout
            .run(self.inner.fetch(path), AssetError::Timeout)
            .await
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }

    async fn delete(&self, path: &str) -> AssetResult<()> {
        self.timeout
            .run(self.inner.delete(path), AssetError::Timeout)
            .await
    }
}
