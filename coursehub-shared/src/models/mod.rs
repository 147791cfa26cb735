/// Domain records stored in the document store
///
/// # Models
///
/// - `course`: courses, modules, lessons and resources
/// - `subscription`: access requests and their status machine
/// - `user`: user profiles with their embedded enrollment set
///
/// Every record type implements [`Entity`], which maps it to and from a
/// stored [`Record`]. The document body never carries the `id` key; it is
/// injected from the record identity on read.
///
/// # Example
///
/// ```
/// use coursehub_shared::models::{course::Module, Entity};
/// use coursehub_shared::store::Record;
/// use serde_json::json;
/// use uuid::Uuid;
///
/// let data = json!({
///     "title": "Getting Started",
///     "order": 1,
///     "course_id": Uuid::new_v4(),
///     "created_at": "2024-01-01T00:00:00Z",
/// });
/// let record = Record { id: Uuid::new_v4(), data: data.as_object().unwrap().clone() };
///
/// let module = Module::from_record(record).unwrap();
/// assert_eq!(module.order, Some(1));
/// ```

pub mod course;
pub mod subscription;
pub mod user;

use crate::store::{Document, Record, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A record type persisted in one collection
pub trait Entity: Serialize + DeserializeOwned {
    /// Collection the records live in
    const COLLECTION: &'static str;

    /// Decodes a stored record
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Malformed` if the body does not match the type.
    fn from_record(record: Record) -> StoreResult<Self> {
        let Record { id, mut data } = record;
        data.insert("id".to_string(), Value::String(id.to_string()));

        serde_json::from_value(Value::Object(data)).map_err(|e| {
            StoreError::Malformed(format!("{}/{}: {}", Self::COLLECTION, id, e))
        })
    }

    /// Encodes the record body, without its `id`
    fn to_document(&self) -> StoreResult<Document> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut data)) => {
                data.remove("id");
                Ok(data)
            }
            Ok(_) => Err(StoreError::Malformed(format!(
                "{} record did not serialize to an object",
                Self::COLLECTION
            ))),
            Err(e) => Err(StoreError::Malformed(e.to_string())),
        }
    }
}
