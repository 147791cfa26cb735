//! Shared fixtures for service-level integration tests
//!
//! Every fixture runs on the in-memory store and asset store so failures can
//! be injected deterministically.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use coursehub_shared::assets::memory::MemoryAssetStore;
use coursehub_shared::assets::{AssetRef, AssetStore, AssetUpload};
use coursehub_shared::auth::{AdminCapability, CurrentUser, Role};
use coursehub_shared::content::assembler::HierarchyAssembler;
use coursehub_shared::content::catalog::CourseCatalog;
use coursehub_shared::enrollment::EnrollmentRegistry;
use coursehub_shared::models::course::{Course, Lesson, Module, Resource};
use coursehub_shared::models::Entity;
use coursehub_shared::store::memory::MemoryStore;
use coursehub_shared::store::DocumentStore;
use coursehub_shared::subscriptions::SubscriptionManager;
use std::sync::Arc;
use uuid::Uuid;

pub struct Fixture {
    pub store: MemoryStore,
    pub assets: MemoryAssetStore,
    pub assembler: HierarchyAssembler,
    pub catalog: CourseCatalog,
    pub enrollments: EnrollmentRegistry,
    pub subscriptions: SubscriptionManager,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let assets = MemoryAssetStore::new("/assets");

        let store_dyn: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let assets_dyn: Arc<dyn AssetStore> = Arc::new(assets.clone());

        Fixture {
            assembler: HierarchyAssembler::new(store_dyn.clone()),
            catalog: CourseCatalog::new(store_dyn.clone(), assets_dyn.clone()),
            enrollments: EnrollmentRegistry::new(store_dyn.clone()),
            subscriptions: SubscriptionManager::new(store_dyn, assets_dyn),
            store,
            assets,
        }
    }

    /// Writes a record directly, bypassing catalog validation
    pub async fn insert<T: Entity>(&self, record: &T) -> Uuid {
        self.store
            .create(T::COLLECTION, record.to_document().unwrap())
            .await
            .unwrap()
    }

    pub async fn seed_course(&self, slug: &str, title: &str) -> Course {
        let mut course = course(slug, title);
        course.id = self.insert(&course).await;
        course
    }

    pub async fn seed_module(&self, course_id: Uuid, title: &str, order: Option<i64>) -> Module {
        let mut module = Module {
            id: Uuid::nil(),
            title: title.to_string(),
            order,
            course_id,
            created_at: base_time(),
        };
        module.id = self.insert(&module).await;
        module
    }

    pub async fn seed_lesson(
        &self,
        module: &Module,
        title: &str,
        order: Option<i64>,
        minutes_after_base: i64,
    ) -> Lesson {
        let mut lesson = Lesson {
            id: Uuid::nil(),
            title: title.to_string(),
            video: AssetRef::external(format!("https://videos.example.com/{}.mp4", title)),
            order,
            created_at: base_time() + Duration::minutes(minutes_after_base),
            module_id: module.id,
            course_id: module.course_id,
        };
        lesson.id = self.insert(&lesson).await;
        lesson
    }

    pub async fn seed_resource(&self, course_id: Uuid, title: &str) -> Resource {
        let mut resource = Resource {
            id: Uuid::nil(),
            title: title.to_string(),
            file: AssetRef::external(format!("https://files.example.com/{}.pdf", title)),
            file_type: "pdf".to_string(),
            course_id,
            created_at: base_time(),
        };
        resource.id = self.insert(&resource).await;
        resource
    }

    /// Learner with an existing profile
    pub async fn learner(&self, full_name: &str) -> CurrentUser {
        let user = learner();
        self.enrollments
            .ensure_profile(&user, Some(full_name))
            .await
            .unwrap();
        user
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

pub fn course(slug: &str, title: &str) -> Course {
    Course {
        id: Uuid::nil(),
        title: title.to_string(),
        description: format!("{} course", title),
        price_cents: 80_000,
        slug: slug.to_string(),
        banner: AssetRef::external("https://images.example.com/banner.png"),
        preview: None,
        community_url: None,
        created_at: base_time(),
        updated_at: base_time(),
    }
}

pub fn learner() -> CurrentUser {
    CurrentUser::new(Uuid::new_v4(), "learner@example.com", Role::Learner)
}

pub fn admin() -> AdminCapability {
    CurrentUser::new(Uuid::new_v4(), "admin@example.com", Role::Admin)
        .admin()
        .unwrap()
}

pub fn receipt() -> AssetUpload {
    AssetUpload::new("bank transfer.jpg", "image/jpeg", vec![0xFFu8, 0xD8, 0xFF, 0xE0])
}
