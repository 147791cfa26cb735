/// Enrollment registry
///
/// A user's enrollments are embedded in their profile document as an array of
/// `{course_id, title, enrolled_at}` entries, unique by `course_id`.
///
/// # Concurrency
///
/// Grants are expressed as an append-unique patch, so the duplicate check runs
/// inside the store's write rather than as a read-then-write in this process.
/// Two concurrent grants for the same course leave one entry.
///
/// # Example
///
/// ```no_run
/// use coursehub_shared::enrollment::EnrollmentRegistry;
/// use coursehub_shared::store::memory::MemoryStore;
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid, course_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let registry = EnrollmentRegistry::new(Arc::new(MemoryStore::new()));
///
/// registry.grant(user_id, course_id, "Web Development").await?;
/// assert!(registry.is_enrolled(user_id, course_id).await?);
/// # Ok(())
/// # }
/// ```

use crate::auth::CurrentUser;
use crate::error::{CourseError, CourseResult};
use crate::models::course::Course;
use crate::models::user::{
    EnrollmentRecord, UserProfile, ENROLLED_COURSES_FIELD, ENROLLMENT_KEY, USERS,
};
use crate::models::Entity;
use crate::store::{BatchOp, DocumentStore, Patch, StoreError};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Append-only view of a user's enrollments, deduplicated by course
///
/// Legacy profiles may hold duplicate entries for one course; the first
/// entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentLog {
    entries: Vec<EnrollmentRecord>,
}

impl EnrollmentLog {
    /// Builds a log from raw entries, keeping the first entry per course
    pub fn from_entries(entries: impl IntoIterator<Item = EnrollmentRecord>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.course_id))
            .collect();
        EnrollmentLog { entries }
    }

    pub fn contains(&self, course_id: Uuid) -> bool {
        self.entries.iter().any(|entry| entry.course_id == course_id)
    }

    pub fn get(&self, course_id: Uuid) -> Option<&EnrollmentRecord> {
        self.entries.iter().find(|entry| entry.course_id == course_id)
    }

    pub fn entries(&self) -> &[EnrollmentRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn course_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.entries.iter().map(|entry| entry.course_id)
    }
}

/// Course membership service
#[derive(Clone)]
pub struct EnrollmentRegistry {
    store: Arc<dyn DocumentStore>,
}

impl EnrollmentRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        EnrollmentRegistry { store }
    }

    async fn profile(&self, user_id: Uuid) -> CourseResult<Option<UserProfile>> {
        let record = self
            .store
            .get(USERS, user_id)
            .await
            .map_err(CourseError::fetch)?;

        record
            .map(UserProfile::from_record)
            .transpose()
            .map_err(CourseError::fetch)
    }

    /// Fetches a user's profile
    pub async fn get_profile(&self, user_id: Uuid) -> CourseResult<UserProfile> {
        self.profile(user_id)
            .await?
            .ok_or_else(|| CourseError::not_found("User", user_id))
    }

    /// Returns the deduplicated enrollment log (empty for unknown users)
    pub async fn enrollments(&self, user_id: Uuid) -> CourseResult<EnrollmentLog> {
        Ok(self
            .profile(user_id)
            .await?
            .map(|profile| EnrollmentLog::from_entries(profile.enrolled_courses))
            .unwrap_or_default())
    }

    /// Checks whether the user is enrolled in the course
    pub async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> CourseResult<bool> {
        Ok(self.enrollments(user_id).await?.contains(course_id))
    }

    /// Builds the grant as a batch operation
    ///
    /// Used by the subscription approval to commit the grant together with
    /// the status change.
    pub fn grant_operation(
        user_id: Uuid,
        course_id: Uuid,
        title: &str,
        enrolled_at: DateTime<Utc>,
    ) -> BatchOp {
        let entry = EnrollmentRecord {
            course_id,
            title: title.to_string(),
            enrolled_at,
        };

        BatchOp::update(
            USERS,
            user_id,
            Patch::new().append_unique(ENROLLED_COURSES_FIELD, ENROLLMENT_KEY, json!(entry)),
        )
    }

    /// Grants the user access to the course
    ///
    /// A no-op when the user is already enrolled.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the user has no profile
    /// - `WriteConflict` on a concurrent write (not retried)
    /// - `TransactionFailure` on other store failures
    pub async fn grant(&self, user_id: Uuid, course_id: Uuid, title: &str) -> CourseResult<()> {
        let op = Self::grant_operation(user_id, course_id, title, Utc::now());

        match self.store.atomic_batch(vec![op]).await {
            Ok(()) => {
                info!(user_id = %user_id, course_id = %course_id, "Enrollment granted");
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => Err(CourseError::not_found("User", user_id)),
            Err(e) => Err(CourseError::write(e)),
        }
    }

    /// Creates the user's profile with an empty enrollment set if missing
    pub async fn ensure_profile(
        &self,
        user: &CurrentUser,
        full_name: Option<&str>,
    ) -> CourseResult<UserProfile> {
        if let Some(profile) = self.profile(user.id).await? {
            return Ok(profile);
        }

        let profile = UserProfile {
            id: user.id,
            email: user.email.clone(),
            full_name: full_name.unwrap_or_default().trim().to_string(),
            enrolled_courses: Vec::new(),
            created_at: Utc::now(),
        };
        let data = profile
            .to_document()
            .map_err(|e| CourseError::Malformed(e.to_string()))?;

        let create = BatchOp::Create {
            collection: USERS.to_string(),
            id: user.id,
            data,
        };

        match self.store.atomic_batch(vec![create]).await {
            Ok(()) => {
                info!(user_id = %user.id, "User profile created");
                Ok(profile)
            }
            // Lost a race with another first request; the stored profile wins
            Err(StoreError::Conflict(_)) => self.get_profile(user.id).await,
            Err(e) => Err(CourseError::write(e)),
        }
    }

    /// Fetches the courses a user is enrolled in, in enrollment order
    ///
    /// Courses that no longer exist are skipped.
    pub async fn enrolled_courses(&self, user_id: Uuid) -> CourseResult<Vec<Course>> {
        let log = self.enrollments(user_id).await?;
        let store = self.store.as_ref();

        let fetched = try_join_all(
            log.course_ids()
                .map(|course_id| async move { store.get(Course::COLLECTION, course_id).await }),
        )
        .await
        .map_err(CourseError::fetch)?;

        let mut courses = Vec::with_capacity(fetched.len());
        for (course_id, record) in log.course_ids().zip(fetched) {
            match record {
                Some(record) => courses.push(Course::from_record(record).map_err(CourseError::fetch)?),
                None => warn!(user_id = %user_id, course_id = %course_id, "Enrolled course no longer exists"),
            }
        }

        debug!(user_id = %user_id, courses = courses.len(), "Loaded enrolled courses");
        Ok(courses)
    }
}
