/// In-memory document store
///
/// Keeps every collection in process memory behind a single `RwLock`. It is
/// used by the API server when no `DATABASE_URL` is configured and by tests.
///
/// # Atomicity
///
/// `atomic_batch` applies operations to a staged copy of the affected
/// collections and swaps the copy in under the write lock only when every
/// operation succeeded. Readers therefore observe either the whole batch or
/// none of it.
///
/// # Fault Injection
///
/// Tests can force failures through [`MemoryStore::faults`]:
///
/// ```
/// use coursehub_shared::store::memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// // Fail the next batch after two of its operations were staged
/// store.faults().fail_next_batch_after(2);
/// ```

use super::{BatchOp, Document, DocumentStore, Filter, Patch, Record, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Sentinel meaning "no batch failure armed"
const NOT_ARMED: usize = usize::MAX;

/// Failure switches for exercising error paths
#[derive(Debug)]
pub struct FaultPlan {
    /// Number of staged operations after which the next batch fails
    batch_fail_after: AtomicUsize,

    /// Collections whose queries fail
    failing_queries: Mutex<HashSet<String>>,

    /// Count of every call made against the store
    calls: AtomicUsize,
}

impl Default for FaultPlan {
    fn default() -> Self {
        FaultPlan {
            batch_fail_after: AtomicUsize::new(NOT_ARMED),
            failing_queries: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FaultPlan {
    /// Makes the next `atomic_batch` fail once `ops` operations were staged
    ///
    /// `0` fails before anything is staged.
    pub fn fail_next_batch_after(&self, ops: usize) {
        self.batch_fail_after.store(ops, Ordering::SeqCst);
    }

    /// Makes every query against `collection` fail until cleared
    pub fn fail_queries_on(&self, collection: &str) {
        if let Ok(mut failing) = self.failing_queries.lock() {
            failing.insert(collection.to_string());
        }
    }

    /// Clears all armed faults
    pub fn clear(&self) {
        self.batch_fail_after.store(NOT_ARMED, Ordering::SeqCst);
        if let Ok(mut failing) = self.failing_queries.lock() {
            failing.clear();
        }
    }

    /// Total number of calls received by the store
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn take_batch_failure(&self) -> Option<usize> {
        let armed = self.batch_fail_after.swap(NOT_ARMED, Ordering::SeqCst);
        (armed != NOT_ARMED).then_some(armed)
    }

    fn query_fails(&self, collection: &str) -> bool {
        self.failing_queries
            .lock()
            .map(|failing| failing.contains(collection))
            .unwrap_or(false)
    }
}

type Collections = HashMap<String, Vec<Record>>;

/// In-memory [`DocumentStore`] implementation
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
    faults: Arc<FaultPlan>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the fault injection switches
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn find<'a>(records: &'a [Record], id: Uuid) -> Option<&'a Record> {
    records.iter().find(|record| record.id == id)
}

fn find_mut(records: &mut [Record], id: Uuid) -> Option<&mut Record> {
    records.iter_mut().find(|record| record.id == id)
}

fn strip_id(mut data: Document) -> Document {
    data.remove("id");
    data
}

/// Applies one operation to the staged collections
fn stage(staged: &mut Collections, op: BatchOp) -> StoreResult<()> {
    match op {
        BatchOp::Create {
            collection,
            id,
            data,
        } => {
            let records = staged.entry(collection.clone()).or_default();
            if find(records, id).is_some() {
                return Err(StoreError::Conflict(format!(
                    "document {}/{} already exists",
                    collection, id
                )));
            }
            records.push(Record {
                id,
                data: strip_id(data),
            });
        }
        BatchOp::Update {
            collection,
            id,
            patch,
        } => {
            let record = staged
                .get_mut(&collection)
                .and_then(|records| find_mut(records, id))
                .ok_or(StoreError::NotFound {
                    collection: collection.clone(),
                    id,
                })?;
            patch.apply(&mut record.data)?;
        }
        BatchOp::Delete { collection, id } => {
            if let Some(records) = staged.get_mut(&collection) {
                records.retain(|record| record.id != id);
            }
        }
        BatchOp::Expect {
            collection,
            id,
            field,
            value,
        } => {
            let record = staged
                .get(&collection)
                .and_then(|records| find(records, id))
                .ok_or(StoreError::NotFound {
                    collection: collection.clone(),
                    id,
                })?;
            if record.data.get(&field) != Some(&value) {
                return Err(StoreError::Conflict(format!(
                    "precondition failed on {}/{}: {} != {}",
                    collection, id, field, value
                )));
            }
        }
    }

    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<Record>> {
        self.faults.record_call();
        if self.faults.query_fails(collection) {
            return Err(StoreError::Backend(format!(
                "injected query failure on {}",
                collection
            )));
        }

        let collections = self.collections.read().await;
        let records = collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| filters.iter().all(|filter| filter.matches(&record.data)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(records)
    }

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Record>> {
        self.faults.record_call();
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|records| find(records, id))
            .cloned())
    }

    async fn create(&self, collection: &str, data: Document) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        self.atomic_batch(vec![BatchOp::Create {
            collection: collection.to_string(),
            id,
            data,
        }])
        .await?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Patch) -> StoreResult<()> {
        self.atomic_batch(vec![BatchOp::update(collection, id, patch)])
            .await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> StoreResult<()> {
        self.atomic_batch(vec![BatchOp::Delete {
            collection: collection.to_string(),
            id,
        }])
        .await
    }

    async fn atomic_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        self.faults.record_call();
        let fail_after = self.faults.take_batch_failure();

        let mut collections = self.collections.write().await;

        // Stage only the collections this batch touches
        let mut staged: Collections = HashMap::new();
        for op in &ops {
            let name = op.collection();
            if !staged.contains_key(name) {
                let current = collections.get(name).cloned().unwrap_or_default();
                staged.insert(name.to_string(), current);
            }
        }

        for (applied, op) in ops.into_iter().enumerate() {
            if fail_after == Some(applied) {
                tracing::debug!(applied, "Injected batch failure, discarding staged writes");
                return Err(StoreError::Backend(
                    "injected failure during atomic batch".to_string(),
                ));
            }
            stage(&mut staged, op)?;
        }

        if let Some(after) = fail_after {
            // Armed beyond the batch length: fail at commit time
            tracing::debug!(after, "Injected commit failure, discarding staged writes");
            return Err(StoreError::Backend(
                "injected failure at batch commit".to_string(),
            ));
        }

        collections.extend(staged);
        Ok(())
    }
}
