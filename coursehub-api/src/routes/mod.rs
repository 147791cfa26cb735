/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `assets`: Uploaded file serving
/// - `courses`: Course list, outlines and authoring
/// - `subscriptions`: Learner subscription requests and enrolled courses
/// - `admin`: Subscription review
/// - `multipart`: Multipart form reader shared by upload endpoints

pub mod admin;
pub mod assets;
pub mod courses;
pub mod health;
pub mod multipart;
pub mod subscriptions;

use crate::error::{ApiError, ApiResult, ValidationErrorDetail};
use axum::Extension;
use coursehub_shared::auth::{require_user, AdminCapability, CurrentUser};
use validator::Validate;

/// Caller identified by the bearer layer, if any
pub type MaybeUser = Option<Extension<CurrentUser>>;

pub(crate) fn caller(user: &MaybeUser) -> Option<&CurrentUser> {
    user.as_ref().map(|Extension(user)| user)
}

/// Requires a signed-in caller
pub(crate) fn signed_in(user: &MaybeUser) -> ApiResult<&CurrentUser> {
    Ok(require_user(caller(user))?)
}

/// Requires a signed-in administrator
pub(crate) fn admin(user: &MaybeUser) -> ApiResult<AdminCapability> {
    Ok(signed_in(user)?.admin()?)
}

/// Runs derive-based validation and maps failures to a 422 response
pub(crate) fn validate_request<T: Validate>(req: &T) -> ApiResult<()> {
    req.validate().map_err(|e| {
        let mut errors: Vec<ValidationErrorDetail> = e
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    })
}
