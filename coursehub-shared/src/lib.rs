//! # CourseHub Shared Library
//!
//! Domain logic for the CourseHub learning platform: course content assembly,
//! enrollment and the subscription review workflow, together with the storage
//! abstractions they run on.
//!
//! ## Module Organization
//!
//! - `store`: document store contract, in-memory and PostgreSQL backends
//! - `assets`: binary asset storage (receipts, banners, resources)
//! - `timeout`: bounded timeouts around every store/asset call
//! - `db`: PostgreSQL pool and migrations
//! - `auth`: JWT claims, caller identity and the admin capability
//! - `models`: course, subscription and user records
//! - `content`: ordering, hierarchy assembly and catalog authoring
//! - `enrollment`: per-user course membership
//! - `subscriptions`: request submission and review
//! - `error`: service error taxonomy

pub mod assets;
pub mod auth;
pub mod content;
pub mod db;
pub mod enrollment;
pub mod error;
pub mod models;
pub mod store;
pub mod subscriptions;
pub mod timeout;

pub use error::{CourseError, CourseResult};

/// Current version of the CourseHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
