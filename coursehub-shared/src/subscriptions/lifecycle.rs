/// Subscription lifecycle manager
///
/// Drives a subscription request from submission through review:
///
/// ```text
/// submit ──► pending ──approve──► approved   (enrollment granted atomically)
///               │
///               └────reject────► rejected
///
/// delete: removes the record from any state, receipt cleaned up best-effort
/// ```
///
/// # Approval Batch
///
/// Approval commits three operations in one atomic batch:
///
/// 1. precondition: status is still `pending`
/// 2. append the course to the requester's enrollment set (deduplicated)
/// 3. status → `approved`, `approved_at` = now
///
/// Either the learner is enrolled and the request is approved, or neither
/// change is visible. Failures are reported, never retried.
///
/// # Example
///
/// ```no_run
/// use coursehub_shared::subscriptions::SubscriptionManager;
/// use coursehub_shared::assets::{memory::MemoryAssetStore, AssetUpload};
/// use coursehub_shared::store::memory::MemoryStore;
/// use coursehub_shared::auth::{CurrentUser, Role};
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// # async fn example(course_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let manager = SubscriptionManager::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MemoryAssetStore::default()),
/// );
///
/// let learner = CurrentUser::new(Uuid::new_v4(), "l@example.com", Role::Learner);
/// let receipt = AssetUpload::new("receipt.jpg", "image/jpeg", vec![1u8, 2, 3]);
/// let request = manager.submit(Some(&learner), course_id, Some(receipt)).await?;
///
/// let admin = CurrentUser::new(Uuid::new_v4(), "ops@example.com", Role::Admin).admin()?;
/// let approved = manager.approve(&admin, request.id).await?;
/// # Ok(())
/// # }
/// ```

use crate::assets::{store_upload, AssetStore, AssetUpload, RECEIPTS_PREFIX};
use crate::auth::{AdminCapability, CurrentUser};
use crate::enrollment::EnrollmentRegistry;
use crate::error::{CourseError, CourseResult};
use crate::models::course::Course;
use crate::models::subscription::{Subscription, SubscriptionStatus, SUBSCRIPTIONS};
use crate::models::Entity;
use crate::store::{BatchOp, DocumentStore, Filter, Patch, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Subscription workflow service
#[derive(Clone)]
pub struct SubscriptionManager {
    store: Arc<dyn DocumentStore>,
    assets: Arc<dyn AssetStore>,
    enrollments: EnrollmentRegistry,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn DocumentStore>, assets: Arc<dyn AssetStore>) -> Self {
        let enrollments = EnrollmentRegistry::new(store.clone());
        SubscriptionManager {
            store,
            assets,
            enrollments,
        }
    }

    async fn load(&self, id: Uuid) -> CourseResult<Subscription> {
        let record = self
            .store
            .get(SUBSCRIPTIONS, id)
            .await
            .map_err(CourseError::fetch)?
            .ok_or_else(|| CourseError::not_found("Subscription", id))?;

        Subscription::from_record(record).map_err(CourseError::fetch)
    }

    async fn query(&self, filters: &[Filter]) -> CourseResult<Vec<Subscription>> {
        let records = self
            .store
            .query(SUBSCRIPTIONS, filters)
            .await
            .map_err(CourseError::fetch)?;

        let mut subscriptions = records
            .into_iter()
            .map(Subscription::from_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(CourseError::fetch)?;

        // Review queue order: oldest submission first
        subscriptions.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(subscriptions)
    }

    /// Submits a subscription request with a payment receipt
    ///
    /// # Errors
    ///
    /// - `Validation` when the user or receipt is missing; nothing is
    ///   uploaded or written
    /// - `NotFound` when the course does not exist
    /// - `Asset` when the receipt upload fails
    /// - `TransactionFailure` / `WriteConflict` when the record cannot be
    ///   written (the uploaded receipt is then removed best-effort)
    pub async fn submit(
        &self,
        user: Option<&CurrentUser>,
        course_id: Uuid,
        receipt: Option<AssetUpload>,
    ) -> CourseResult<Subscription> {
        let user = user.ok_or_else(|| {
            CourseError::Validation("you must be signed in to subscribe".to_string())
        })?;
        let receipt = receipt.filter(|r| !r.is_empty()).ok_or_else(|| {
            CourseError::Validation("a payment receipt is required".to_string())
        })?;

        let course_record = self
            .store
            .get(Course::COLLECTION, course_id)
            .await
            .map_err(CourseError::fetch)?
            .ok_or_else(|| CourseError::not_found("Course", course_id))?;
        let course = Course::from_record(course_record).map_err(CourseError::fetch)?;

        let profile = self.enrollments.ensure_profile(user, None).await?;

        let stored = store_upload(self.assets.as_ref(), RECEIPTS_PREFIX, &receipt).await?;

        let now = Utc::now();
        let mut subscription = Subscription {
            id: Uuid::nil(),
            user_id: user.id,
            user_name: profile.display_name().to_string(),
            user_email: user.email.clone(),
            course_id: course.id,
            course_title: course.title,
            price_cents: course.price_cents,
            receipt: stored,
            status: SubscriptionStatus::Pending,
            submitted_at: now,
            created_at: now,
            approved_at: None,
            rejected_at: None,
        };

        let data = subscription
            .to_document()
            .map_err(|e| CourseError::Malformed(e.to_string()))?;

        match self.store.create(SUBSCRIPTIONS, data).await {
            Ok(id) => subscription.id = id,
            Err(e) => {
                if let Some(path) = &subscription.receipt.path {
                    if let Err(cleanup) = self.assets.delete(path).await {
                        warn!(path = %path, error = %cleanup, "Failed to remove receipt after failed submission");
                    }
                }
                return Err(CourseError::write(e));
            }
        }

        info!(
            subscription_id = %subscription.id,
            user_id = %user.id,
            course_id = %course_id,
            "Subscription request submitted"
        );
        Ok(subscription)
    }

    /// Approves a pending request and enrolls the requester
    ///
    /// Approving an already approved request is a successful no-op.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the request does not exist
    /// - `InvalidTransition` when the request was rejected
    /// - `WriteConflict` when a concurrent reviewer changed it first
    /// - `TransactionFailure` when the batch fails; nothing was persisted
    pub async fn approve(
        &self,
        admin: &AdminCapability,
        id: Uuid,
    ) -> CourseResult<Subscription> {
        self.transition(admin, id, SubscriptionStatus::Approved).await
    }

    /// Rejects a pending request
    ///
    /// Rejecting an already rejected request is a successful no-op.
    pub async fn reject(&self, admin: &AdminCapability, id: Uuid) -> CourseResult<Subscription> {
        self.transition(admin, id, SubscriptionStatus::Rejected).await
    }

    async fn transition(
        &self,
        admin: &AdminCapability,
        id: Uuid,
        target: SubscriptionStatus,
    ) -> CourseResult<Subscription> {
        let current = self.load(id).await?;

        if current.status == target {
            info!(subscription_id = %id, status = %target, "Subscription already in target status");
            return Ok(current);
        }
        if !current.status.can_transition_to(target) {
            return Err(CourseError::InvalidTransition {
                from: current.status.to_string(),
                to: target.to_string(),
            });
        }

        let now = Utc::now();
        let ops = transition_ops(&current, target, now);

        match self.store.atomic_batch(ops).await {
            Ok(()) => {
                info!(
                    admin_id = %admin.admin_id(),
                    subscription_id = %id,
                    user_id = %current.user_id,
                    course_id = %current.course_id,
                    status = %target,
                    "Subscription reviewed"
                );
                Ok(apply_status(current, target, now))
            }
            Err(StoreError::Conflict(reason)) => {
                // Precondition lost to a concurrent reviewer
                let latest = self.load(id).await?;
                if latest.status == target {
                    info!(subscription_id = %id, status = %target, "Concurrent review reached the same status");
                    Ok(latest)
                } else {
                    warn!(subscription_id = %id, reason = %reason, "Subscription changed during review");
                    Err(CourseError::WriteConflict(format!(
                        "subscription {} is now {}",
                        id, latest.status
                    )))
                }
            }
            Err(StoreError::NotFound { collection, id: missing }) if collection == SUBSCRIPTIONS => {
                Err(CourseError::not_found("Subscription", missing))
            }
            Err(e) => {
                error!(subscription_id = %id, status = %target, error = %e, "Subscription review transaction failed");
                Err(CourseError::TransactionFailure(format!(
                    "could not mark subscription {} as {}: {}",
                    id, target, e
                )))
            }
        }
    }

    /// Deletes a request from any state
    ///
    /// The receipt is removed first on a best-effort basis; a failure there
    /// is logged and the record is still deleted. Enrollment is not revoked.
    ///
    /// # Errors
    ///
    /// - `Validation` when `confirmed` is false
    /// - `NotFound` when the request does not exist
    pub async fn delete(
        &self,
        admin: &AdminCapability,
        id: Uuid,
        confirmed: bool,
    ) -> CourseResult<()> {
        if !confirmed {
            return Err(CourseError::Validation(
                "deletion must be confirmed".to_string(),
            ));
        }

        let subscription = self.load(id).await?;

        if let Some(path) = &subscription.receipt.path {
            if let Err(e) = self.assets.delete(path).await {
                warn!(subscription_id = %id, path = %path, error = %e, "Failed to delete receipt, removing record anyway");
            }
        }

        self.store
            .delete(SUBSCRIPTIONS, id)
            .await
            .map_err(CourseError::write)?;

        info!(admin_id = %admin.admin_id(), subscription_id = %id, "Subscription deleted");
        Ok(())
    }

    /// Fetches one request
    pub async fn get(&self, _admin: &AdminCapability, id: Uuid) -> CourseResult<Subscription> {
        self.load(id).await
    }

    /// Lists requests, optionally filtered by status, oldest first
    pub async fn list(
        &self,
        _admin: &AdminCapability,
        status: Option<SubscriptionStatus>,
    ) -> CourseResult<Vec<Subscription>> {
        let filters: Vec<Filter> = status
            .map(|s| Filter::eq("status", s.as_str()))
            .into_iter()
            .collect();
        self.query(&filters).await
    }

    /// Lists the caller's own requests, oldest first
    pub async fn list_for_user(&self, user: &CurrentUser) -> CourseResult<Vec<Subscription>> {
        self.query(&[Filter::eq("user_id", user.id.to_string())]).await
    }
}

/// Operations committing a review decision
fn transition_ops(
    current: &Subscription,
    target: SubscriptionStatus,
    now: DateTime<Utc>,
) -> Vec<BatchOp> {
    let guard = BatchOp::expect(
        SUBSCRIPTIONS,
        current.id,
        "status",
        SubscriptionStatus::Pending.as_str(),
    );

    match target {
        SubscriptionStatus::Approved => vec![
            guard,
            EnrollmentRegistry::grant_operation(
                current.user_id,
                current.course_id,
                &current.course_title,
                now,
            ),
            BatchOp::update(
                SUBSCRIPTIONS,
                current.id,
                Patch::new()
                    .set("status", target.as_str())
                    .set("approved_at", now.to_rfc3339()),
            ),
        ],
        _ => vec![
            guard,
            BatchOp::update(
                SUBSCRIPTIONS,
                current.id,
                Patch::new()
                    .set("status", target.as_str())
                    .set("rejected_at", now.to_rfc3339()),
            ),
        ],
    }
}

fn apply_status(
    mut subscription: Subscription,
    target: SubscriptionStatus,
    now: DateTime<Utc>,
) -> Subscription {
    subscription.status = target;
    match target {
        SubscriptionStatus::Approved => subscription.approved_at = Some(now),
        SubscriptionStatus::Rejected => subscription.rejected_at = Some(now),
        SubscriptionStatus::Pending => {}
    }
    subscription
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetRef;

    fn pending() -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Ada".to_string(),
            user_email: "ada@example.com".to_string(),
            course_id: Uuid::new_v4(),
            course_title: "Web Development".to_string(),
            price_cents: 80_000,
            receipt: AssetRef::stored("subscriptions/receipts/r.jpg", "/assets/subscriptions/receipts/r.jpg"),
            status: SubscriptionStatus::Pending,
            submitted_at: now,
            created_at: now,
            approved_at: None,
            rejected_at: None,
        }
    }

    #[test]
    fn test_approval_ops_guard_grant_and_flip() {
        let sub = pending();
        let ops = transition_ops(&sub, SubscriptionStatus::Approved, Utc::now());

        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[0], BatchOp::Expect { field, .. } if field == "status"));
        assert_eq!(ops[1].collection(), "users");
        assert_eq!(ops[2].collection(), SUBSCRIPTIONS);
    }

    #[test]
    fn test_rejection_ops_do_not_touch_enrollment() {
        let ops = transition_ops(&pending(), SubscriptionStatus::Rejected, Utc::now());
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.collection() == SUBSCRIPTIONS));
    }

    #[test]
    fn test_apply_status_sets_matching_timestamp() {
        let now = Utc::now();
        let approved = apply_status(pending(), SubscriptionStatus::Approved, now);
        assert_eq!(approved.approved_at, Some(now));
        assert_eq!(approved.rejected_at, None);

        let rejected = apply_status(pending(), SubscriptionStatus::Rejected, now);
        assert_eq!(rejected.rejected_at, Some(now));
        assert_eq!(rejected.approved_at, None);
    }
}
