/// Course content records
///
/// ```text
/// Course ─┬─ Module ── Lesson
///         └─ Resource
/// ```
///
/// Records are flat and reference their parents by ID. Lessons carry both
/// their module and a denormalized course reference; the two always agree
/// for lessons written through the catalog.

use super::Entity;
use crate::assets::AssetRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const COURSES: &str = "courses";
pub const MODULES: &str = "modules";
pub const LESSONS: &str = "lessons";
pub const RESOURCES: &str = "resources";

/// A purchasable course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,

    /// Price in minor currency units
    pub price_cents: i64,

    /// URL-safe identifier used for routing
    pub slug: String,

    pub banner: AssetRef,

    #[serde(default)]
    pub preview: Option<AssetRef>,

    /// Link to the course's community group
    #[serde(default)]
    pub community_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Course {
    const COLLECTION: &'static str = COURSES;
}

/// A group of lessons within a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: Uuid,
    pub title: String,

    /// Ordering key; modules without one sort last
    #[serde(default)]
    pub order: Option<i64>,

    pub course_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Entity for Module {
    const COLLECTION: &'static str = MODULES;
}

/// A single video lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    pub video: AssetRef,

    /// Ordering key; lessons without one sort last
    #[serde(default)]
    pub order: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub module_id: Uuid,
    pub course_id: Uuid,
}

impl Entity for Lesson {
    const COLLECTION: &'static str = LESSONS;
}

/// A downloadable file attached to a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub file: AssetRef,

    /// Free-form label such as "pdf" or "zip"
    pub file_type: String,

    pub course_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Entity for Resource {
    const COLLECTION: &'static str = RESOURCES;
}
