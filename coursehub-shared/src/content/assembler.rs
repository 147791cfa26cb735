/// Course content hierarchy assembly
///
/// Modules, lessons and resources are stored as flat records. The assembler
/// queries them independently and rebuilds the tree a learner navigates:
///
/// ```text
/// CourseOutline
/// ├── course
/// ├── modules (ordering key, then title)
/// │   └── lessons (ordering key, then created_at)
/// └── resources (store order)
/// ```
///
/// # Query Plan
///
/// 1. Course by slug
/// 2. Modules and resources by course ID, concurrently
/// 3. Lessons with one query per module, all concurrently
///
/// Any failing query aborts the whole assembly with `CourseError::Fetch`;
/// a partial tree is never returned. Assembly is read-only.
///
/// # Example
///
/// ```no_run
/// use coursehub_shared::content::assembler::HierarchyAssembler;
/// use coursehub_shared::store::{memory::MemoryStore, DocumentStore};
/// use coursehub_shared::auth::{CurrentUser, Role};
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
/// let assembler = HierarchyAssembler::new(store);
///
/// let viewer = CurrentUser::new(Uuid::new_v4(), "l@example.com", Role::Learner);
/// let outline = assembler.assemble(Some(&viewer), "web-dev").await?;
/// for module in &outline.modules {
///     println!("{} ({} lessons)", module.module.title, module.lessons.len());
/// }
/// # Ok(())
/// # }
/// ```

use super::ordering::{sort_lessons, sort_modules};
use super::{find_course_by_slug, query_entities};
use crate::auth::{require_user, CurrentUser};
use crate::error::{CourseError, CourseResult};
use crate::models::course::{Course, Lesson, Module, Resource};
use crate::store::{DocumentStore, Filter};
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// A module with its ordered lessons
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleOutline {
    #[serde(flatten)]
    pub module: Module,
    pub lessons: Vec<Lesson>,
}

/// Fully assembled course tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseOutline {
    pub course: Course,
    pub modules: Vec<ModuleOutline>,
    pub resources: Vec<Resource>,
}

impl CourseOutline {
    /// Total number of lessons across all modules
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    /// First lesson in navigation order, if any
    pub fn first_lesson(&self) -> Option<&Lesson> {
        self.modules.iter().flat_map(|m| m.lessons.iter()).next()
    }
}

/// Builds [`CourseOutline`]s from the document store
#[derive(Clone)]
pub struct HierarchyAssembler {
    store: Arc<dyn DocumentStore>,
}

impl HierarchyAssembler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        HierarchyAssembler { store }
    }

    /// Assembles the course identified by `slug` for `viewer`
    ///
    /// # Errors
    ///
    /// - `AccessDenied` when there is no viewer (no store call is made)
    /// - `NotFound` when no course has the slug
    /// - `Fetch` when any query fails
    pub async fn assemble(
        &self,
        viewer: Option<&CurrentUser>,
        slug: &str,
    ) -> CourseResult<CourseOutline> {
        let viewer = require_user(viewer)?;
        debug!(viewer_id = %viewer.id, slug = %slug, "Assembling course outline");

        let store = self.store.as_ref();
        let course = find_course_by_slug(store, slug)
            .await?
            .ok_or_else(|| CourseError::not_found("Course", slug))?;

        let by_course = [Filter::eq("course_id", course.id.to_string())];
        let (mut modules, resources) = futures::try_join!(
            query_entities::<Module>(store, &by_course),
            query_entities::<Resource>(store, &by_course)
        )
        .map_err(CourseError::fetch)?;

        sort_modules(&mut modules);

        let lesson_groups = try_join_all(modules.iter().map(|module| async move {
            let by_module = [Filter::eq("module_id", module.id.to_string())];
            query_entities::<Lesson>(store, &by_module).await
        }))
        .await
        .map_err(CourseError::fetch)?;

        let modules: Vec<ModuleOutline> = modules
            .into_iter()
            .zip(lesson_groups)
            .map(|(module, lessons)| {
                let mut lessons = retain_consistent(&course, &module, lessons);
                sort_lessons(&mut lessons);
                ModuleOutline { module, lessons }
            })
            .collect();

        let outline = CourseOutline {
            course,
            modules,
            resources,
        };

        debug!(
            course_id = %outline.course.id,
            modules = outline.modules.len(),
            lessons = outline.lesson_count(),
            resources = outline.resources.len(),
            "Course outline assembled"
        );

        Ok(outline)
    }
}

/// Drops lessons whose references disagree with the module they were found under
fn retain_consistent(course: &Course, module: &Module, lessons: Vec<Lesson>) -> Vec<Lesson> {
    lessons
        .into_iter()
        .filter(|lesson| {
            let consistent = lesson.module_id == module.id && lesson.course_id == course.id;
            if !consistent {
                warn!(
                    lesson_id = %lesson.id,
                    module_id = %module.id,
                    lesson_course_id = %lesson.course_id,
                    course_id = %course.id,
                    "Excluding lesson with inconsistent course reference"
                );
            }
            consistent
        })
        .collect()
}
