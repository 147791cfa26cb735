/// Course catalog administration
///
/// Administrators author courses, modules, lessons and resources here. Every
/// mutating operation requires an [`AdminCapability`]; listing and slug lookup
/// are public.
///
/// # Invariants Enforced on Write
///
/// - Course slugs are URL-safe (`[a-z0-9-]`, no leading/trailing dash) and unique
/// - A lesson's course reference is copied from its module
/// - Prices are non-negative minor units
///
/// # Example
///
/// ```no_run
/// use coursehub_shared::content::catalog::{CourseCatalog, NewCourse};
/// use coursehub_shared::assets::{memory::MemoryAssetStore, AssetUpload};
/// use coursehub_shared::store::memory::MemoryStore;
/// use coursehub_shared::auth::{CurrentUser, Role};
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = CourseCatalog::new(Arc::new(MemoryStore::new()), Arc::new(MemoryAssetStore::default()));
/// let admin = CurrentUser::new(Uuid::new_v4(), "ops@example.com", Role::Admin).admin()?;
///
/// let course = catalog
///     .create_course(
///         &admin,
///         NewCourse {
///             title: "Web Development".to_string(),
///             description: "HTML, CSS and JavaScript".to_string(),
///             price_cents: 80_000,
///             slug: "web-dev".to_string(),
///             community_url: None,
///             preview_url: None,
///         },
///         AssetUpload::new("banner.png", "image/png", vec![0u8; 16]),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```

use super::{find_course_by_slug, query_entities};
use crate::assets::{
    store_upload, AssetRef, AssetStore, AssetUpload, COURSE_IMAGES_PREFIX, RESOURCES_PREFIX,
};
use crate::auth::AdminCapability;
use crate::error::{CourseError, CourseResult};
use crate::models::course::{Course, Lesson, Module, Resource};
use crate::models::Entity;
use crate::store::{Document, DocumentStore, Patch};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Maximum slug length
pub const MAX_SLUG_LENGTH: usize = 100;

/// Input for a new course
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub slug: String,
    pub community_url: Option<String>,

    /// Externally hosted preview video
    pub preview_url: Option<String>,
}

/// Partial course update; `None` fields are left unchanged
///
/// An empty `community_url` removes the link.
#[derive(Debug, Clone, Default)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub slug: Option<String>,
    pub community_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewModule {
    pub title: String,
    pub order: Option<i64>,
}

/// Input for a new lesson; the video is an externally hosted URL
#[derive(Debug, Clone)]
pub struct NewLesson {
    pub title: String,
    pub video_url: String,
    pub order: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: String,
    pub file_type: String,
}

/// Checks slug syntax
pub fn validate_slug(slug: &str) -> CourseResult<()> {
    let well_formed = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LENGTH
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if well_formed {
        Ok(())
    } else {
        Err(CourseError::Validation(format!(
            "slug '{}' must be 1-{} characters of a-z, 0-9 and '-', without leading or trailing '-'",
            slug, MAX_SLUG_LENGTH
        )))
    }
}

fn require_text(field: &str, value: &str) -> CourseResult<()> {
    if value.trim().is_empty() {
        Err(CourseError::Validation(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

fn require_price(price_cents: i64) -> CourseResult<()> {
    if price_cents < 0 {
        Err(CourseError::Validation("price must not be negative".to_string()))
    } else {
        Ok(())
    }
}

fn encode<T: Entity>(record: &T) -> CourseResult<Document> {
    record
        .to_document()
        .map_err(|e| CourseError::Malformed(e.to_string()))
}

/// Admin-facing course authoring service
#[derive(Clone)]
pub struct CourseCatalog {
    store: Arc<dyn DocumentStore>,
    assets: Arc<dyn AssetStore>,
}

impl CourseCatalog {
    pub fn new(store: Arc<dyn DocumentStore>, assets: Arc<dyn AssetStore>) -> Self {
        CourseCatalog { store, assets }
    }

    /// Lists every course in store order
    pub async fn list_courses(&self) -> CourseResult<Vec<Course>> {
        query_entities(self.store.as_ref(), &[])
            .await
            .map_err(CourseError::fetch)
    }

    /// Looks up a course by slug
    pub async fn find_by_slug(&self, slug: &str) -> CourseResult<Course> {
        find_course_by_slug(self.store.as_ref(), slug)
            .await?
            .ok_or_else(|| CourseError::not_found("Course", slug))
    }

    /// Fetches a course by ID
    pub async fn get_course(&self, course_id: Uuid) -> CourseResult<Course> {
        self.load(course_id, "Course").await
    }

    async fn load<T: Entity>(&self, id: Uuid, entity: &'static str) -> CourseResult<T> {
        let record = self
            .store
            .get(T::COLLECTION, id)
            .await
            .map_err(CourseError::fetch)?
            .ok_or_else(|| CourseError::not_found(entity, id))?;

        T::from_record(record).map_err(|e| CourseError::Malformed(e.to_string()))
    }

    async fn ensure_slug_available(&self, slug: &str, except: Option<Uuid>) -> CourseResult<()> {
        match find_course_by_slug(self.store.as_ref(), slug).await? {
            Some(existing) if Some(existing.id) != except => Err(CourseError::Validation(
                format!("slug '{}' is already taken", slug),
            )),
            _ => Ok(()),
        }
    }

    /// Stores a record and returns the ID assigned by the store
    async fn insert<T: Entity>(&self, record: &T) -> CourseResult<Uuid> {
        self.store
            .create(T::COLLECTION, encode(record)?)
            .await
            .map_err(CourseError::write)
    }

    /// Deletes an asset uploaded for a write that did not go through
    async fn discard_asset(&self, asset: &AssetRef) {
        if let Some(path) = &asset.path {
            if let Err(e) = self.assets.delete(path).await {
                warn!(path = %path, error = %e, "Failed to clean up orphaned asset");
            }
        }
    }

    /// Creates a course and uploads its banner
    ///
    /// # Errors
    ///
    /// - `Validation` for empty title/description, bad or taken slug,
    ///   negative price or an empty banner
    /// - `Asset` when the banner upload fails
    pub async fn create_course(
        &self,
        admin: &AdminCapability,
        new: NewCourse,
        banner: AssetUpload,
    ) -> CourseResult<Course> {
        require_text("title", &new.title)?;
        require_text("description", &new.description)?;
        require_price(new.price_cents)?;
        validate_slug(&new.slug)?;
        if banner.is_empty() {
            return Err(CourseError::Validation("banner image is required".to_string()));
        }
        self.ensure_slug_available(&new.slug, None).await?;

        let banner = store_upload(self.assets.as_ref(), COURSE_IMAGES_PREFIX, &banner).await?;

        let now = Utc::now();
        let mut course = Course {
            id: Uuid::nil(),
            title: new.title.trim().to_string(),
            description: new.description.trim().to_string(),
            price_cents: new.price_cents,
            slug: new.slug,
            banner,
            preview: new.preview_url.filter(|u| !u.trim().is_empty()).map(AssetRef::external),
            community_url: new.community_url.filter(|u| !u.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };

        course.id = match self.insert(&course).await {
            Ok(id) => id,
            Err(e) => {
                self.discard_asset(&course.banner).await;
                return Err(e);
            }
        };

        info!(
            admin_id = %admin.admin_id(),
            course_id = %course.id,
            slug = %course.slug,
            "Course created"
        );
        Ok(course)
    }

    /// Applies a partial update to a course
    pub async fn update_course(
        &self,
        admin: &AdminCapability,
        course_id: Uuid,
        update: CourseUpdate,
    ) -> CourseResult<Course> {
        let current: Course = self.load(course_id, "Course").await?;
        let mut patch = Patch::new();

        if let Some(title) = update.title {
            require_text("title", &title)?;
            patch = patch.set("title", title.trim());
        }
        if let Some(description) = update.description {
            require_text("description", &description)?;
            patch = patch.set("description", description.trim());
        }
        if let Some(price_cents) = update.price_cents {
            require_price(price_cents)?;
            patch = patch.set("price_cents", price_cents);
        }
        if let Some(slug) = update.slug {
            validate_slug(&slug)?;
            if slug != current.slug {
                self.ensure_slug_available(&slug, Some(course_id)).await?;
            }
            patch = patch.set("slug", slug);
        }
        if let Some(url) = update.community_url {
            patch = if url.trim().is_empty() {
                patch.remove("community_url")
            } else {
                patch.set("community_url", url.trim())
            };
        }

        if patch.is_empty() {
            return Ok(current);
        }

        patch = patch.set("updated_at", Utc::now().to_rfc3339());
        self.store
            .update(Course::COLLECTION, course_id, patch)
            .await
            .map_err(CourseError::write)?;

        info!(admin_id = %admin.admin_id(), course_id = %course_id, "Course updated");
        self.load(course_id, "Course").await
    }

    /// Adds a module to a course
    pub async fn add_module(
        &self,
        admin: &AdminCapability,
        course_id: Uuid,
        new: NewModule,
    ) -> CourseResult<Module> {
        require_text("title", &new.title)?;
        let course: Course = self.load(course_id, "Course").await?;

        let mut module = Module {
            id: Uuid::nil(),
            title: new.title.trim().to_string(),
            order: new.order,
            course_id: course.id,
            created_at: Utc::now(),
        };
        module.id = self.insert(&module).await?;

        info!(
            admin_id = %admin.admin_id(),
            course_id = %course_id,
            module_id = %module.id,
            "Module added"
        );
        Ok(module)
    }

    /// Adds a lesson to a module
    ///
    /// The lesson's course reference is taken from the module.
    pub async fn add_lesson(
        &self,
        admin: &AdminCapability,
        module_id: Uuid,
        new: NewLesson,
    ) -> CourseResult<Lesson> {
        require_text("title", &new.title)?;
        require_text("video_url", &new.video_url)?;
        let module: Module = self.load(module_id, "Module").await?;

        let mut lesson = Lesson {
            id: Uuid::nil(),
            title: new.title.trim().to_string(),
            video: AssetRef::external(new.video_url.trim()),
            order: new.order,
            created_at: Utc::now(),
            module_id: module.id,
            course_id: module.course_id,
        };
        lesson.id = self.insert(&lesson).await?;

        info!(
            admin_id = %admin.admin_id(),
            module_id = %module_id,
            lesson_id = %lesson.id,
            "Lesson added"
        );
        Ok(lesson)
    }

    /// Uploads a file and attaches it to a course
    pub async fn add_resource(
        &self,
        admin: &AdminCapability,
        course_id: Uuid,
        new: NewResource,
        file: AssetUpload,
    ) -> CourseResult<Resource> {
        require_text("title", &new.title)?;
        if file.is_empty() {
            return Err(CourseError::Validation("resource file is required".to_string()));
        }
        let course: Course = self.load(course_id, "Course").await?;

        let stored = store_upload(self.assets.as_ref(), RESOURCES_PREFIX, &file).await?;
        let file_type = if new.file_type.trim().is_empty() {
            file.content_type.clone()
        } else {
            new.file_type.trim().to_string()
        };

        let mut resource = Resource {
            id: Uuid::nil(),
            title: new.title.trim().to_string(),
            file: stored,
            file_type,
            course_id: course.id,
            created_at: Utc::now(),
        };

        resource.id = match self.insert(&resource).await {
            Ok(id) => id,
            Err(e) => {
                self.discard_asset(&resource.file).await;
                return Err(e);
            }
        };

        info!(
            admin_id = %admin.admin_id(),
            course_id = %course_id,
            resource_id = %resource.id,
            "Resource added"
        );
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("web-dev").is_ok());
        assert!(validate_slug("python-101").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("-web").is_err());
        assert!(validate_slug("web-").is_err());
        assert!(validate_slug("Web-Dev").is_err());
        assert!(validate_slug("web dev").is_err());
        assert!(validate_slug("web/dev").is_err());
        assert!(validate_slug(&"a".repeat(MAX_SLUG_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_require_text_and_price() {
        assert!(require_text("title", "  ").is_err());
        assert!(require_text("title", "Intro").is_ok());
        assert!(require_price(-1).is_err());
        assert!(require_price(0).is_ok());
    }
}
