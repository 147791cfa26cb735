/// User profiles
///
/// The profile document is keyed by the authentication provider's user ID
/// and embeds the user's enrollment set.
///
/// # Document Shape
///
/// ```json
/// {
///   "email": "learner@example.com",
///   "full_name": "Ada Learner",
///   "enrolled_courses": [
///     { "course_id": "…", "title": "Web Development", "enrolled_at": "…" }
///   ],
///   "created_at": "…"
/// }
/// ```

use super::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USERS: &str = "users";

/// Field holding the embedded enrollment set
pub const ENROLLED_COURSES_FIELD: &str = "enrolled_courses";

/// Key enrollment entries are unique on
pub const ENROLLMENT_KEY: &str = "course_id";

/// One course membership embedded in a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub course_id: Uuid,

    /// Course title at grant time
    pub title: String,

    pub enrolled_at: DateTime<Utc>,
}

/// A user's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,

    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub enrolled_courses: Vec<EnrollmentRecord>,

    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Name shown to reviewers; falls back to "Unnamed"
    pub fn display_name(&self) -> &str {
        let name = self.full_name.trim();
        if name.is_empty() {
            "Unnamed"
        } else {
            name
        }
    }
}

impl Entity for UserProfile {
    const COLLECTION: &'static str = USERS;
}
