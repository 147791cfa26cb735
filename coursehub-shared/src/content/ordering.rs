/// Deterministic ordering of modules and lessons
///
/// - Modules: ordering key ascending, then title ascending
/// - Lessons: ordering key ascending, then creation timestamp ascending
///
/// A missing ordering key sorts after every explicit key. All sorts are
/// stable, so records that tie on both criteria keep their store order.

use crate::models::course::{Lesson, Module};
use std::cmp::Ordering;

/// Compares optional ordering keys, placing `None` last
pub fn compare_keys(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn compare_modules(a: &Module, b: &Module) -> Ordering {
    compare_keys(a.order, b.order).then_with(|| a.title.cmp(&b.title))
}

pub fn compare_lessons(a: &Lesson, b: &Lesson) -> Ordering {
    compare_keys(a.order, b.order).then_with(|| a.created_at.cmp(&b.created_at))
}

pub fn sort_modules(modules: &mut [Module]) {
    modules.sort_by(compare_modules);
}

pub fn sort_lessons(lessons: &mut [Lesson]) {
    lessons.sort_by(compare_lessons);
}
