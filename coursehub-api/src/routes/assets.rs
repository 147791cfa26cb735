/// Uploaded file serving
///
/// # Endpoint
///
/// ```text
/// GET /assets/course-images/1717000000000_ab12cd34_banner.png
/// ```
///
/// Used when `ASSET_PUBLIC_URL` points back at this server. Deployments that
/// publish assets through a CDN never hit this route.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use coursehub_shared::assets::AssetError;

/// Guesses a content type from the file extension
fn content_type_for(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "txt" => "text/plain; charset=utf-8",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Streams a stored file
///
/// # Errors
///
/// - `404 Not Found`: Unknown or invalid path
/// - `502 Bad Gateway`: Storage backend failure
pub async fn serve_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let bytes = state.assets.fetch(&path).await.map_err(|e| match e {
        AssetError::NotFound(_) | AssetError::InvalidPath(_) => {
            ApiError::NotFound(format!("Asset not found: {}", path))
        }
        other => ApiError::BadGateway(other.to_string()),
    })?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes))
}
