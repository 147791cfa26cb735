/// Course content
///
/// - [`ordering`]: deterministic module and lesson ordering
/// - [`assembler`]: builds the Course → Module → Lesson tree for a viewer
/// - [`catalog`]: admin authoring of courses, modules, lessons and resources

pub mod assembler;
pub mod catalog;
pub mod ordering;

use crate::error::{CourseError, CourseResult};
use crate::models::course::Course;
use crate::models::Entity;
use crate::store::{DocumentStore, Filter, StoreResult};

/// Runs a query and decodes every returned record
pub(crate) async fn query_entities<T: Entity>(
    store: &dyn DocumentStore,
    filters: &[Filter],
) -> StoreResult<Vec<T>> {
    store
        .query(T::COLLECTION, filters)
        .await?
        .into_iter()
        .map(T::from_record)
        .collect()
}

/// Resolves a course by slug
///
/// Slugs are unique for courses created through the catalog. Older data may
/// hold duplicates; the first match in store order wins.
pub(crate) async fn find_course_by_slug(
    store: &dyn DocumentStore,
    slug: &str,
) -> CourseResult<Option<Course>> {
    let mut courses: Vec<Course> = query_entities(store, &[Filter::eq("slug", slug)])
        .await
        .map_err(CourseError::fetch)?;

    if courses.len() > 1 {
        tracing::warn!(slug = %slug, matches = courses.len(), "Duplicate course slug, using first match");
    }

    Ok(if courses.is_empty() {
        None
    } else {
        Some(courses.swap_remove(0))
    })
}
