/// Subscription review endpoints
///
/// All endpoints require an administrator token.
///
/// # Endpoints
///
/// - `GET /v1/admin/subscriptions?status=pending` - List requests
/// - `GET /v1/admin/subscriptions/:id` - Fetch one request
/// - `POST /v1/admin/subscriptions/:id/approve` - Approve and enroll
/// - `POST /v1/admin/subscriptions/:id/reject` - Reject
/// - `DELETE /v1/admin/subscriptions/:id?confirm=true` - Delete request and receipt

use super::{admin, MaybeUser};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use coursehub_shared::models::subscription::{Subscription, SubscriptionStatus};
use serde::Deserialize;
use uuid::Uuid;

/// List filter
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// pending, approved or rejected
    pub status: Option<String>,
}

/// Delete confirmation
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// List subscription requests, oldest first
///
/// # Endpoint
///
/// ```text
/// GET /v1/admin/subscriptions?status=pending
/// Authorization: Bearer <admin_jwt_token>
/// ```
pub async fn list_subscriptions(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Subscription>>> {
    let admin = admin(&user)?;

    let status = query
        .status
        .as_deref()
        .map(str::parse::<SubscriptionStatus>)
        .transpose()
        .map_err(|e| ApiError::invalid("status", e))?;

    Ok(Json(state.subscriptions.list(&admin, status).await?))
}

/// Fetch one subscription request
pub async fn get_subscription(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Subscription>> {
    let admin = admin(&user)?;
    Ok(Json(state.subscriptions.get(&admin, id).await?))
}

/// Approve a request
///
/// Enrollment and status change are committed atomically. Approving an
/// approved request returns it unchanged.
///
/// # Errors
///
/// - `404 Not Found`: Unknown request
/// - `409 Conflict`: Request was rejected, or a concurrent review won
/// - `500 Internal Server Error`: Transaction failed, nothing persisted
pub async fn approve_subscription(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Subscription>> {
    let admin = admin(&user)?;
    Ok(Json(state.subscriptions.approve(&admin, id).await?))
}

/// Reject a request
pub async fn reject_subscription(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Subscription>> {
    let admin = admin(&user)?;
    Ok(Json(state.subscriptions.reject(&admin, id).await?))
}

/// Delete a request and its receipt
///
/// Requires `?confirm=true`.
pub async fn delete_subscription(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<StatusCode> {
    let admin = admin(&user)?;
    state.subscriptions.delete(&admin, id, query.confirm).await?;
    Ok(StatusCode::NO_CONTENT)
}
