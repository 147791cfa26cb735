/// Learner-facing subscription endpoints
///
/// # Endpoints
///
/// - `POST /v1/courses/:id/subscriptions` - Submit a request with a receipt (multipart)
/// - `POST /v1/me/profile` - Create the caller's profile
/// - `GET /v1/me/subscriptions` - The caller's requests
/// - `GET /v1/me/courses` - Courses the caller is enrolled in

use super::multipart::read_form;
use super::{caller, signed_in, validate_request, MaybeUser};
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use coursehub_shared::models::course::Course;
use coursehub_shared::models::subscription::Subscription;
use coursehub_shared::models::user::UserProfile;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Profile request
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: String,
}

/// Submit a subscription request
///
/// # Endpoint
///
/// ```text
/// POST /v1/courses/:id/subscriptions
/// Authorization: Bearer <jwt_token>
/// Content-Type: multipart/form-data
///
/// receipt (file)
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Not signed in, or no receipt attached
/// - `404 Not Found`: Unknown course
/// - `502 Bad Gateway`: Receipt upload failed
pub async fn submit_subscription(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(course_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Subscription>)> {
    let mut form = read_form(multipart).await?;
    let receipt = form.take_file("receipt");

    let subscription = state
        .subscriptions
        .submit(caller(&user), course_id, receipt)
        .await?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Create the caller's profile
///
/// Existing profiles are returned unchanged.
///
/// # Endpoint
///
/// ```text
/// POST /v1/me/profile
/// Authorization: Bearer <jwt_token>
///
/// { "full_name": "Ada Lovelace" }
/// ```
pub async fn save_profile(
    State(state): State<AppState>,
    user: MaybeUser,
    Json(req): Json<ProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    let user = signed_in(&user)?;
    validate_request(&req)?;

    let profile = state
        .enrollments
        .ensure_profile(user, Some(&req.full_name))
        .await?;

    Ok(Json(profile))
}

/// The caller's subscription requests, oldest first
pub async fn my_subscriptions(
    State(state): State<AppState>,
    user: MaybeUser,
) -> ApiResult<Json<Vec<Subscription>>> {
    let user = signed_in(&user)?;
    Ok(Json(state.subscriptions.list_for_user(user).await?))
}

/// Courses the caller is enrolled in, in enrollment order
pub async fn my_courses(
    State(state): State<AppState>,
    user: MaybeUser,
) -> ApiResult<Json<Vec<Course>>> {
    let user = signed_in(&user)?;
    Ok(Json(state.enrollments.enrolled_courses(user.id).await?))
}
