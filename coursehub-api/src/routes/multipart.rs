/// Multipart form reader
///
/// Upload endpoints receive `multipart/form-data` bodies mixing text fields
/// and files. [`read_form`] drains the stream into a [`FormData`] so handlers
/// can validate text fields before any file reaches the asset store.

use crate::error::{ApiError, ApiResult};
use axum::extract::Multipart;
use coursehub_shared::assets::AssetUpload;
use std::collections::HashMap;

/// Content type assumed when a file part carries none
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Buffered multipart form
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, AssetUpload>,
}

impl FormData {
    /// Text field value, trimmed; blank values count as absent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Text field value or an empty string
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    /// Parses a numeric text field
    pub fn number(&self, name: &str) -> ApiResult<Option<i64>> {
        self.text(name)
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| ApiError::invalid(name, format!("{} must be an integer", name)))
            })
            .transpose()
    }

    /// Removes and returns an uploaded file
    pub fn take_file(&mut self, name: &str) -> Option<AssetUpload> {
        self.files.remove(name)
    }
}

/// Reads every part of a multipart body
///
/// Parts with a file name are treated as files, everything else as text.
///
/// # Errors
///
/// Returns `400 Bad Request` when the body is not valid multipart.
pub async fn read_form(mut multipart: Multipart) -> ApiResult<FormData> {
    let mut form = FormData::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                form.files
                    .insert(name, AssetUpload::new(file_name, content_type, bytes));
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}
