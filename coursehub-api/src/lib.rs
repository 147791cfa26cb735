//! # CourseHub API Server Library
//!
//! HTTP surface over the CourseHub services: course outlines, course
//! authoring, subscription requests and their review.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
