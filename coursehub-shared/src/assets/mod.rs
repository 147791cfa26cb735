/// Binary asset storage
///
/// Receipts, course banners, lesson videos and downloadable resources are
/// stored as opaque blobs addressed by a slash-separated path. Documents only
/// keep an [`AssetRef`] pointing at them.
///
/// # Path Layout
///
/// Uploaded files get an unguessable name built by [`asset_path`]. Assets are
/// served without authentication, so the 128-bit nonce is what keeps a
/// receipt private:
///
/// ```text
/// {prefix}/{unix_millis}_{32 hex nonce}_{sanitized file name}
/// ```
///
/// | Prefix                   | Content              |
/// |--------------------------|----------------------|
/// | `subscriptions/receipts` | payment receipts     |
/// | `course-images`          | course banners       |
/// | `resources`              | downloadable files   |
///
/// # Implementations
///
/// - [`memory::MemoryAssetStore`]: in-process, with fault injection
/// - [`fs::FsAssetStore`]: local filesystem on `tokio::fs`

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix for subscription payment receipts
pub const RECEIPTS_PREFIX: &str = "subscriptions/receipts";

/// Prefix for course banner images
pub const COURSE_IMAGES_PREFIX: &str = "course-images";

/// Prefix for course resources
pub const RESOURCES_PREFIX: &str = "resources";

/// Asset result type alias
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors raised by asset store implementations
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid asset path: {0}")]
    InvalidPath(String),

    #[error("Asset call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Asset backend error: {0}")]
    Backend(String),
}

/// Reference to a binary asset stored on a document
///
/// `path` is present for assets held by the [`AssetStore`] and absent for
/// externally hosted links (for example a video URL pasted by an admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub url: String,
}

impl AssetRef {
    /// Reference to an asset held by the asset store
    pub fn stored(path: impl Into<String>, url: impl Into<String>) -> Self {
        AssetRef {
            path: Some(path.into()),
            url: url.into(),
        }
    }

    /// Reference to an externally hosted asset
    pub fn external(url: impl Into<String>) -> Self {
        AssetRef {
            path: None,
            url: url.into(),
        }
    }
}

/// A file received from a client, ready to be stored
#[derive(Debug, Clone)]
pub struct AssetUpload {
    /// Client-supplied file name (sanitized before use)
    pub file_name: String,

    /// MIME type reported by the client
    pub content_type: String,

    /// File contents
    pub bytes: Bytes,
}

impl AssetUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        AssetUpload {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Object storage contract
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Stores `bytes` at `path`, replacing any existing object
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> AssetResult<()>;

    /// Reads the object at `path`
    async fn fetch(&self, path: &str) -> AssetResult<Bytes>;

    /// Public URL under which `path` is served
    fn public_url(&self, path: &str) -> String;

    /// Deletes the object at `path`
    async fn delete(&self, path: &str) -> AssetResult<()>;
}

/// Uploads a client file under `prefix` and returns a reference to it
///
/// # Errors
///
/// Propagates the asset store's upload error.
pub async fn store_upload(
    assets: &dyn AssetStore,
    prefix: &str,
    upload: &AssetUpload,
) -> AssetResult<AssetRef> {
    let path = asset_path(prefix, &upload.file_name);
    assets
        .upload(&path, upload.bytes.clone(), &upload.content_type)
        .await?;

    tracing::debug!(path = %path, size = upload.bytes.len(), "Stored asset");
    let url = assets.public_url(&path);
    Ok(AssetRef::stored(path, url))
}

/// Builds a unique object path for an uploaded file
pub fn asset_path(prefix: &str, file_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!(
        "{}/{}_{}_{}",
        prefix.trim_end_matches('/'),
        millis,
        uuid::Uuid::new_v4().simple(),
        sanitize_file_name(file_name)
    )
}

/// Reduces a client file name to `[A-Za-z0-9._-]`
///
/// Directory components are dropped; anything else becomes `_`.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Rejects absolute paths, traversal and empty segments
pub fn validate_path(path: &str) -> AssetResult<()> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        Err(AssetError::InvalidPath(path.to_string()))
    } else {
        Ok(())
    }
}

/// Joins a public base URL and an object path
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}
