/// Integration tests for the subscription review workflow
///
/// Run with: cargo test --test subscription_lifecycle_tests

mod common;

use common::{admin, learner, receipt, Fixture};
use coursehub_shared::assets::AssetUpload;
use coursehub_shared::models::subscription::{SubscriptionStatus, SUBSCRIPTIONS};
use coursehub_shared::models::user::USERS;
use coursehub_shared::CourseError;
use uuid::Uuid;

#[tokio::test]
async fn test_submit_creates_pending_request_with_receipt() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada Lovelace").await;

    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    assert_eq!(sub.status, SubscriptionStatus::Pending);
    assert_eq!(sub.user_id, user.id);
    assert_eq!(sub.user_name, "Ada Lovelace");
    assert_eq!(sub.user_email, "learner@example.com");
    assert_eq!(sub.course_title, "Web Development");
    assert_eq!(sub.price_cents, 80_000);
    assert!(sub.approved_at.is_none());

    let path = sub.receipt.path.clone().unwrap();
    assert!(path.starts_with("subscriptions/receipts/"));
    assert!(path.ends_with("_bank_transfer.jpg"));
    assert_eq!(sub.receipt.url, format!("/assets/{}", path));
    assert!(fx.assets.contains(&path).await);

    let admin = admin();
    assert_eq!(fx.subscriptions.get(&admin, sub.id).await.unwrap(), sub);
}

#[tokio::test]
async fn test_submit_creates_missing_profile() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = learner();

    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    assert_eq!(sub.user_name, "Unnamed");
    assert!(fx.enrollments.get_profile(user.id).await.is_ok());
}

#[tokio::test]
async fn test_submit_without_receipt_is_rejected_before_any_write() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;

    let missing = fx.subscriptions.submit(Some(&user), course.id, None).await;
    assert!(matches!(missing, Err(CourseError::Validation(_))));

    let empty = AssetUpload::new("empty.jpg", "image/jpeg", Vec::new());
    let empty = fx.subscriptions.submit(Some(&user), course.id, Some(empty)).await;
    assert!(matches!(empty, Err(CourseError::Validation(_))));

    assert_eq!(fx.store.count(SUBSCRIPTIONS).await, 0);
    assert_eq!(fx.assets.object_count().await, 0);
}

#[tokio::test]
async fn test_submit_without_user_is_rejected() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;

    let result = fx.subscriptions.submit(None, course.id, Some(receipt())).await;
    assert!(matches!(result, Err(CourseError::Validation(_))));
    assert_eq!(fx.store.count(SUBSCRIPTIONS).await, 0);
}

#[tokio::test]
async fn test_submit_for_unknown_course_uploads_nothing() {
    let fx = Fixture::new();
    let user = fx.learner("Ada").await;

    let result = fx
        .subscriptions
        .submit(Some(&user), Uuid::new_v4(), Some(receipt()))
        .await;

    assert!(matches!(result, Err(CourseError::NotFound { entity: "Course", .. })));
    assert_eq!(fx.assets.object_count().await, 0);
}

#[tokio::test]
async fn test_submit_upload_failure_is_fatal() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    fx.assets.set_fail_uploads(true);

    let result = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await;

    assert!(matches!(result, Err(CourseError::Asset(_))));
    assert_eq!(fx.store.count(SUBSCRIPTIONS).await, 0);
}

#[tokio::test]
async fn test_submit_record_failure_removes_uploaded_receipt() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    fx.store.faults().fail_next_batch_after(0);

    let result = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await;

    assert!(matches!(result, Err(CourseError::TransactionFailure(_))));
    assert_eq!(fx.store.count(SUBSCRIPTIONS).await, 0);
    assert_eq!(fx.assets.object_count().await, 0);
}

#[tokio::test]
async fn test_approve_enrolls_and_approves() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    let approved = fx.subscriptions.approve(&admin(), sub.id).await.unwrap();

    assert_eq!(approved.status, SubscriptionStatus::Approved);
    assert!(approved.approved_at.is_some());
    assert!(fx.enrollments.is_enrolled(user.id, course.id).await.unwrap());

    let stored = fx.subscriptions.get(&admin(), sub.id).await.unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Approved);
    assert_eq!(stored.approved_at, approved.approved_at);

    let log = fx.enrollments.enrollments(user.id).await.unwrap();
    assert_eq!(log.get(course.id).unwrap().title, "Web Development");
}

#[tokio::test]
async fn test_approving_twice_keeps_single_enrollment() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    let first = fx.subscriptions.approve(&admin(), sub.id).await.unwrap();
    let second = fx.subscriptions.approve(&admin(), sub.id).await.unwrap();

    assert_eq!(first.approved_at, second.approved_at);
    let profile = fx.enrollments.get_profile(user.id).await.unwrap();
    assert_eq!(profile.enrolled_courses.len(), 1);
}

#[tokio::test]
async fn test_two_requests_for_same_course_enroll_once() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;

    let a = fx.subscriptions.submit(Some(&user), course.id, Some(receipt())).await.unwrap();
    let b = fx.subscriptions.submit(Some(&user), course.id, Some(receipt())).await.unwrap();

    fx.subscriptions.approve(&admin(), a.id).await.unwrap();
    fx.subscriptions.approve(&admin(), b.id).await.unwrap();

    let profile = fx.enrollments.get_profile(user.id).await.unwrap();
    assert_eq!(profile.enrolled_courses.len(), 1);
}

#[tokio::test]
async fn test_concurrent_approvals_both_succeed_with_one_grant() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    let reviewer_a = admin();
    let reviewer_b = admin();
    let (a, b) = tokio::join!(
        fx.subscriptions.approve(&reviewer_a, sub.id),
        fx.subscriptions.approve(&reviewer_b, sub.id)
    );

    assert_eq!(a.unwrap().status, SubscriptionStatus::Approved);
    assert_eq!(b.unwrap().status, SubscriptionStatus::Approved);
    let profile = fx.enrollments.get_profile(user.id).await.unwrap();
    assert_eq!(profile.enrolled_courses.len(), 1);
}

#[tokio::test]
async fn test_concurrent_approve_and_reject_have_one_winner() {
    for _ in 0..25 {
        let fx = Fixture::new();
        let course = fx.seed_course("web-dev", "Web Development").await;
        let user = fx.learner("Ada").await;
        let sub = fx
            .subscriptions
            .submit(Some(&user), course.id, Some(receipt()))
            .await
            .unwrap();

        let approver = admin();
        let rejecter = admin();
        let (approved, rejected) = tokio::join!(
            fx.subscriptions.approve(&approver, sub.id),
            fx.subscriptions.reject(&rejecter, sub.id)
        );

        assert_ne!(approved.is_ok(), rejected.is_ok());
        let loser = if approved.is_ok() { rejected } else { approved };
        assert!(matches!(
            loser,
            Err(CourseError::WriteConflict(_)) | Err(CourseError::InvalidTransition { .. })
        ));

        let stored = fx.subscriptions.get(&admin(), sub.id).await.unwrap();
        assert_ne!(stored.status, SubscriptionStatus::Pending);
        assert_eq!(
            fx.enrollments.is_enrolled(user.id, course.id).await.unwrap(),
            stored.status == SubscriptionStatus::Approved
        );
    }
}

#[tokio::test]
async fn test_failure_mid_approval_persists_nothing() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    // Fail after the guard and the enrollment grant were staged
    fx.store.faults().fail_next_batch_after(2);
    let result = fx.subscriptions.approve(&admin(), sub.id).await;

    assert!(matches!(result, Err(CourseError::TransactionFailure(_))));
    assert!(!fx.enrollments.is_enrolled(user.id, course.id).await.unwrap());
    let stored = fx.subscriptions.get(&admin(), sub.id).await.unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Pending);
    assert!(stored.approved_at.is_none());

    // A retry by the reviewer goes through
    let approved = fx.subscriptions.approve(&admin(), sub.id).await.unwrap();
    assert_eq!(approved.status, SubscriptionStatus::Approved);
    assert!(fx.enrollments.is_enrolled(user.id, course.id).await.unwrap());
}

#[tokio::test]
async fn test_approval_fails_cleanly_when_requester_profile_is_gone() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    use coursehub_shared::store::DocumentStore;
    fx.store.delete(USERS, user.id).await.unwrap();

    let result = fx.subscriptions.approve(&admin(), sub.id).await;
    assert!(matches!(result, Err(CourseError::TransactionFailure(_))));
    let stored = fx.subscriptions.get(&admin(), sub.id).await.unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Pending);
}

#[tokio::test]
async fn test_rejected_request_cannot_be_approved() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    let rejected = fx.subscriptions.reject(&admin(), sub.id).await.unwrap();
    assert_eq!(rejected.status, SubscriptionStatus::Rejected);
    assert!(rejected.rejected_at.is_some());

    let result = fx.subscriptions.approve(&admin(), sub.id).await;
    assert!(matches!(result, Err(CourseError::InvalidTransition { .. })));
    assert!(!fx.enrollments.is_enrolled(user.id, course.id).await.unwrap());

    // Rejecting again is a no-op
    let again = fx.subscriptions.reject(&admin(), sub.id).await.unwrap();
    assert_eq!(again.rejected_at, rejected.rejected_at);
}

#[tokio::test]
async fn test_approved_request_cannot_be_rejected() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    fx.subscriptions.approve(&admin(), sub.id).await.unwrap();
    let result = fx.subscriptions.reject(&admin(), sub.id).await;

    match result {
        Err(CourseError::InvalidTransition { from, to }) => {
            assert_eq!(from, "approved");
            assert_eq!(to, "rejected");
        }
        other => panic!("expected InvalidTransition, got {:?}", other),
    }
}

#[tokio::test]
async fn test_review_of_missing_request_is_not_found() {
    let fx = Fixture::new();
    let result = fx.subscriptions.approve(&admin(), Uuid::new_v4()).await;
    assert!(matches!(result, Err(CourseError::NotFound { entity: "Subscription", .. })));
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    let result = fx.subscriptions.delete(&admin(), sub.id, false).await;
    assert!(matches!(result, Err(CourseError::Validation(_))));
    assert_eq!(fx.store.count(SUBSCRIPTIONS).await, 1);
    assert_eq!(fx.assets.object_count().await, 1);
}

#[tokio::test]
async fn test_delete_removes_record_and_receipt() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();
    fx.subscriptions.approve(&admin(), sub.id).await.unwrap();

    fx.subscriptions.delete(&admin(), sub.id, true).await.unwrap();

    assert_eq!(fx.store.count(SUBSCRIPTIONS).await, 0);
    assert_eq!(fx.assets.object_count().await, 0);
    // Enrollment survives deletion of the request
    assert!(fx.enrollments.is_enrolled(user.id, course.id).await.unwrap());
}

#[tokio::test]
async fn test_delete_with_failing_asset_delete_still_removes_record() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let user = fx.learner("Ada").await;
    let sub = fx
        .subscriptions
        .submit(Some(&user), course.id, Some(receipt()))
        .await
        .unwrap();

    fx.assets.set_fail_deletes(true);
    fx.subscriptions.delete(&admin(), sub.id, true).await.unwrap();

    assert_eq!(fx.store.count(SUBSCRIPTIONS).await, 0);
    assert!(fx.assets.contains(sub.receipt.path.as_deref().unwrap()).await);
}

#[tokio::test]
async fn test_listing_by_status_and_by_user() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let ada = fx.learner("Ada").await;
    let bob = fx.learner("Bob").await;

    let first = fx.subscriptions.submit(Some(&ada), course.id, Some(receipt())).await.unwrap();
    let second = fx.subscriptions.submit(Some(&bob), course.id, Some(receipt())).await.unwrap();
    fx.subscriptions.approve(&admin(), first.id).await.unwrap();

    let all = fx.subscriptions.list(&admin(), None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, first.id);

    let pending = fx
        .subscriptions
        .list(&admin(), Some(SubscriptionStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);

    let mine = fx.subscriptions.list_for_user(&ada).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, SubscriptionStatus::Approved);
}
