/// Integration tests for course hierarchy assembly
///
/// Run with: cargo test --test assembler_tests

mod common;

use common::{learner, Fixture};
use coursehub_shared::auth::AuthzError;
use coursehub_shared::models::course::Lesson;
use coursehub_shared::CourseError;
use uuid::Uuid;

fn titles(lessons: &[Lesson]) -> Vec<&str> {
    lessons.iter().map(|l| l.title.as_str()).collect()
}

#[tokio::test]
async fn test_unauthenticated_assembly_makes_no_store_calls() {
    let fx = Fixture::new();
    fx.seed_course("web-dev", "Web Development").await;
    let calls_before = fx.store.faults().call_count();

    let result = fx.assembler.assemble(None, "web-dev").await;

    assert!(matches!(
        result,
        Err(CourseError::AccessDenied(AuthzError::Unauthenticated))
    ));
    assert_eq!(fx.store.faults().call_count(), calls_before);
}

#[tokio::test]
async fn test_web_dev_modules_follow_ordering_key() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    fx.seed_module(course.id, "CSS Layouts", Some(2)).await;
    fx.seed_module(course.id, "HTML Basics", Some(1)).await;

    let viewer = learner();
    let outline = fx.assembler.assemble(Some(&viewer), "web-dev").await.unwrap();

    assert_eq!(outline.course.id, course.id);
    let module_titles: Vec<&str> = outline.modules.iter().map(|m| m.module.title.as_str()).collect();
    assert_eq!(module_titles, vec!["HTML Basics", "CSS Layouts"]);
}

#[tokio::test]
async fn test_lessons_grouped_and_ordered_per_module() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let html = fx.seed_module(course.id, "HTML", Some(1)).await;
    let css = fx.seed_module(course.id, "CSS", Some(2)).await;

    // Inserted out of order on purpose
    fx.seed_lesson(&html, "forms", Some(3), 0).await;
    fx.seed_lesson(&css, "flexbox", Some(1), 0).await;
    fx.seed_lesson(&html, "appendix", None, 1).await;
    fx.seed_lesson(&html, "tags-late", Some(1), 30).await;
    fx.seed_lesson(&html, "tags-early", Some(1), 10).await;
    fx.seed_lesson(&html, "links", Some(2), 5).await;

    let viewer = learner();
    let outline = fx.assembler.assemble(Some(&viewer), "web-dev").await.unwrap();

    assert_eq!(outline.modules.len(), 2);
    assert_eq!(
        titles(&outline.modules[0].lessons),
        vec!["tags-early", "tags-late", "links", "forms", "appendix"]
    );
    assert_eq!(titles(&outline.modules[1].lessons), vec!["flexbox"]);
    assert_eq!(outline.lesson_count(), 6);
    assert_eq!(outline.first_lesson().unwrap().title, "tags-early");
}

#[tokio::test]
async fn test_modules_sharing_key_sorted_by_title_and_unkeyed_last() {
    let fx = Fixture::new();
    let course = fx.seed_course("python", "Python").await;
    fx.seed_module(course.id, "Bonus", None).await;
    fx.seed_module(course.id, "Loops", Some(1)).await;
    fx.seed_module(course.id, "Functions", Some(1)).await;

    let viewer = learner();
    let outline = fx.assembler.assemble(Some(&viewer), "python").await.unwrap();

    let module_titles: Vec<&str> = outline.modules.iter().map(|m| m.module.title.as_str()).collect();
    assert_eq!(module_titles, vec!["Functions", "Loops", "Bonus"]);
}

#[tokio::test]
async fn test_resources_in_store_order_and_scoped_to_course() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let other = fx.seed_course("design", "Design").await;
    fx.seed_resource(course.id, "cheatsheet").await;
    fx.seed_resource(other.id, "palette").await;
    fx.seed_resource(course.id, "syllabus").await;

    let viewer = learner();
    let outline = fx.assembler.assemble(Some(&viewer), "web-dev").await.unwrap();

    let resource_titles: Vec<&str> = outline.resources.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(resource_titles, vec!["cheatsheet", "syllabus"]);
    assert!(outline.modules.is_empty());
}

#[tokio::test]
async fn test_unknown_slug_is_not_found() {
    let fx = Fixture::new();
    fx.seed_course("web-dev", "Web Development").await;

    let viewer = learner();
    let result = fx.assembler.assemble(Some(&viewer), "missing").await;
    assert!(matches!(result, Err(CourseError::NotFound { entity: "Course", .. })));
}

#[tokio::test]
async fn test_duplicate_slug_resolves_to_first_match() {
    let fx = Fixture::new();
    let first = fx.seed_course("web-dev", "First").await;
    fx.seed_course("web-dev", "Second").await;

    let viewer = learner();
    let outline = fx.assembler.assemble(Some(&viewer), "web-dev").await.unwrap();
    assert_eq!(outline.course.id, first.id);
}

#[tokio::test]
async fn test_lesson_query_failure_aborts_assembly() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let module = fx.seed_module(course.id, "HTML", Some(1)).await;
    fx.seed_lesson(&module, "tags", Some(1), 0).await;

    fx.store.faults().fail_queries_on("lessons");

    let viewer = learner();
    let result = fx.assembler.assemble(Some(&viewer), "web-dev").await;
    assert!(matches!(result, Err(CourseError::Fetch(_))));
}

#[tokio::test]
async fn test_module_query_failure_aborts_assembly() {
    let fx = Fixture::new();
    fx.seed_course("web-dev", "Web Development").await;
    fx.store.faults().fail_queries_on("modules");

    let viewer = learner();
    let result = fx.assembler.assemble(Some(&viewer), "web-dev").await;
    assert!(matches!(result, Err(CourseError::Fetch(_))));
}

#[tokio::test]
async fn test_lesson_with_foreign_course_reference_is_excluded() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let module = fx.seed_module(course.id, "HTML", Some(1)).await;
    fx.seed_lesson(&module, "tags", Some(1), 0).await;

    // Module reference matches, denormalized course reference does not
    let mut stray = module.clone();
    stray.course_id = Uuid::new_v4();
    fx.seed_lesson(&stray, "stray", Some(2), 0).await;

    let viewer = learner();
    let outline = fx.assembler.assemble(Some(&viewer), "web-dev").await.unwrap();
    assert_eq!(titles(&outline.modules[0].lessons), vec!["tags"]);
}

#[tokio::test]
async fn test_assembly_is_read_only() {
    let fx = Fixture::new();
    let course = fx.seed_course("web-dev", "Web Development").await;
    let module = fx.seed_module(course.id, "HTML", Some(1)).await;
    fx.seed_lesson(&module, "tags", Some(1), 0).await;

    let viewer = learner();
    let first = fx.assembler.assemble(Some(&viewer), "web-dev").await.unwrap();
    let second = fx.assembler.assemble(Some(&viewer), "web-dev").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fx.store.count("lessons").await, 1);
    assert_eq!(fx.store.count("users").await, 0);
}
