/// Service-level error taxonomy
///
/// Store and asset errors are translated at the service boundary according to
/// the path they occurred on:
///
/// | Origin                         | Becomes                    |
/// |--------------------------------|----------------------------|
/// | store failure on a read path   | `Fetch`                    |
/// | store conflict on a write path | `WriteConflict`            |
/// | other store failure on a write | `TransactionFailure`       |
/// | asset upload failure           | `Asset`                    |
/// | missing caller / wrong role    | `AccessDenied`             |

use crate::assets::AssetError;
use crate::auth::AuthzError;
use crate::store::StoreError;

/// Result alias for service operations
pub type CourseResult<T> = Result<T, CourseError>;

#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    /// The named entity does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Access denied: {0}")]
    AccessDenied(#[from] AuthzError),

    /// Caller input was rejected before anything was written
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid subscription transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A concurrent writer changed the record first
    #[error("Write conflict: {0}")]
    WriteConflict(String),

    /// The atomic write failed and nothing was persisted
    #[error("Transaction failed: {0}")]
    TransactionFailure(String),

    /// A read failed; no partial result was produced
    #[error("Could not load data: {0}")]
    Fetch(String),

    #[error("Asset storage failed: {0}")]
    Asset(#[from] AssetError),

    /// A stored document could not be decoded
    #[error("Malformed record: {0}")]
    Malformed(String),
}

impl CourseError {
    pub fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        CourseError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Translates a store error raised while reading
    pub fn fetch(err: StoreError) -> Self {
        match err {
            StoreError::Malformed(msg) => CourseError::Malformed(msg),
            other => CourseError::Fetch(other.to_string()),
        }
    }

    /// Translates a store error raised while writing
    pub fn write(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => CourseError::WriteConflict(msg),
            other => CourseError::TransactionFailure(other.to_string()),
        }
    }

    /// True for failures a client may retry unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CourseError::Fetch(_) | CourseError::WriteConflict(_) | CourseError::TransactionFailure(_)
        )
    }
}
