/// Document store client
///
/// This module defines the contract for the persistent document store that
/// backs every CourseHub record. Records live in named collections, are keyed
/// by UUID and carry a JSON object body.
///
/// # Operations
///
/// - `query`: equality-filtered reads in the store's natural order
/// - `get` / `create` / `update` / `delete`: single-document CRUD
/// - `atomic_batch`: all-or-nothing multi-document write
///
/// # Implementations
///
/// - [`memory::MemoryStore`]: in-process store with fault injection
/// - [`postgres::PgDocumentStore`]: PostgreSQL JSONB store built on sqlx
///
/// # Example
///
/// ```no_run
/// use coursehub_shared::store::{DocumentStore, Filter, memory::MemoryStore};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let mut doc = serde_json::Map::new();
/// doc.insert("slug".to_string(), json!("web-dev"));
/// store.create("courses", doc).await?;
///
/// let found = store.query("courses", &[Filter::eq("slug", "web-dev")]).await?;
/// assert_eq!(found.len(), 1);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// JSON object body of a stored document
pub type Document = serde_json::Map<String, Value>;

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by document store implementations
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Target document does not exist
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: Uuid },

    /// A precondition or concurrent write rejected the operation
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// The call did not complete within its time budget
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// Backend failure (connection, query, transaction)
    #[error("Store backend error: {0}")]
    Backend(String),

    /// Stored data could not be interpreted
    #[error("Malformed document: {0}")]
    Malformed(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                // 40001 serialization_failure, 40P01 deadlock_detected, 23505 unique_violation
                match db_err.code().as_deref() {
                    Some("40001") | Some("40P01") | Some("23505") => {
                        StoreError::Conflict(db_err.message().to_string())
                    }
                    _ => StoreError::Backend(err.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut => StoreError::Backend("connection pool timed out".to_string()),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// A stored document together with its identity
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Document ID
    pub id: Uuid,

    /// Document body (never contains the `id` key)
    pub data: Document,
}

/// Equality filter on a top-level document field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name
    pub field: String,

    /// Value the field must equal
    pub value: Value,
}

impl Filter {
    /// Creates an equality filter
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Checks whether a document satisfies this filter
    pub fn matches(&self, data: &Document) -> bool {
        data.get(&self.field) == Some(&self.value)
    }
}

/// Mutation applied to a single field by an update
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Replace the field value
    Set(Value),

    /// Remove the field
    Remove,

    /// Append `item` to the array field unless an element already has the
    /// same value under `key`. A missing field is treated as an empty array.
    AppendUnique { key: String, item: Value },
}

/// Partial update of a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Vec<(String, FieldUpdate)>,
}

impl Patch {
    /// Creates an empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((field.into(), FieldUpdate::Set(value.into())));
        self
    }

    /// Removes a field
    pub fn remove(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), FieldUpdate::Remove));
        self
    }

    /// Appends to an array field, deduplicated on `key`
    pub fn append_unique(
        mut self,
        field: impl Into<String>,
        key: impl Into<String>,
        item: impl Into<Value>,
    ) -> Self {
        self.fields.push((
            field.into(),
            FieldUpdate::AppendUnique {
                key: key.into(),
                item: item.into(),
            },
        ));
        self
    }

    /// Returns true if the patch carries no field updates
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the field updates in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &(String, FieldUpdate)> {
        self.fields.iter()
    }

    /// Applies the patch to a document body in place
    ///
    /// Shared by every backend so patch semantics stay identical.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Malformed` if an append targets a non-array field
    /// or the `id` key is touched.
    pub fn apply(&self, data: &mut Document) -> StoreResult<()> {
        for (field, update) in &self.fields {
            if field == "id" {
                return Err(StoreError::Malformed("the id field is immutable".to_string()));
            }

            match update {
                FieldUpdate::Set(value) => {
                    data.insert(field.clone(), value.clone());
                }
                FieldUpdate::Remove => {
                    data.remove(field);
                }
                FieldUpdate::AppendUnique { key, item } => {
                    let entry = data.entry(field.clone()).or_insert(Value::Null);
                    if entry.is_null() {
                        *entry = Value::Array(Vec::new());
                    }

                    let items = entry.as_array_mut().ok_or_else(|| {
                        StoreError::Malformed(format!("field {} is not an array", field))
                    })?;

                    let needle = item.get(key);
                    let exists = needle.is_some()
                        && items.iter().any(|existing| existing.get(key) == needle);

                    if !exists {
                        items.push(item.clone());
                    }
                }
            }
        }

        Ok(())
    }
}

/// Single operation inside an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Create a document with a caller-chosen ID (fails if it exists)
    Create {
        collection: String,
        id: Uuid,
        data: Document,
    },

    /// Apply a patch to an existing document (fails if absent)
    Update {
        collection: String,
        id: Uuid,
        patch: Patch,
    },

    /// Delete a document (absent documents are ignored)
    Delete { collection: String, id: Uuid },

    /// Precondition: the document exists and `field` equals `value`.
    /// A failed expectation aborts the batch with `StoreError::Conflict`.
    Expect {
        collection: String,
        id: Uuid,
        field: String,
        value: Value,
    },
}

impl BatchOp {
    /// Creates an update operation
    pub fn update(collection: &str, id: Uuid, patch: Patch) -> Self {
        BatchOp::Update {
            collection: collection.to_string(),
            id,
            patch,
        }
    }

    /// Creates a precondition operation
    pub fn expect(collection: &str, id: Uuid, field: &str, value: impl Into<Value>) -> Self {
        BatchOp::Expect {
            collection: collection.to_string(),
            id,
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Collection targeted by the operation
    pub fn collection(&self) -> &str {
        match self {
            BatchOp::Create { collection, .. }
            | BatchOp::Update { collection, .. }
            | BatchOp::Delete { collection, .. }
            | BatchOp::Expect { collection, .. } => collection,
        }
    }
}

/// Document store contract
///
/// Implementations must be safe to share across concurrent request handlers.
/// `atomic_batch` is the only multi-document primitive and must be
/// all-or-nothing: concurrent readers never observe a partially applied batch.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns all documents in `collection` matching every filter, in the
    /// store's natural (insertion) order
    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<Record>>;

    /// Fetches a document by ID
    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Record>>;

    /// Creates a document and returns its generated ID
    async fn create(&self, collection: &str, data: Document) -> StoreResult<Uuid>;

    /// Applies a partial update to an existing document
    async fn update(&self, collection: &str, id: Uuid, patch: Patch) -> StoreResult<()>;

    /// Deletes a document; deleting an absent document is not an error
    async fn delete(&self, collection: &str, id: Uuid) -> StoreResult<()>;

    /// Applies all operations atomically
    async fn atomic_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()>;

    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
