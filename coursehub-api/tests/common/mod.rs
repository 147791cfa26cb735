//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - In-memory application wiring
//! - JWT token generation for learners and administrators
//! - Request helpers, including hand-built multipart bodies

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use coursehub_api::app::{build_router, AppState};
use coursehub_api::config::Config;
use coursehub_shared::assets::memory::MemoryAssetStore;
use coursehub_shared::auth::jwt::{create_token, Claims};
use coursehub_shared::auth::{CurrentUser, Role};
use coursehub_shared::store::memory::MemoryStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

const BOUNDARY: &str = "coursehub-test-boundary";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: MemoryStore,
    pub assets: MemoryAssetStore,
    pub config: Config,
}

/// A caller with a signed bearer token
pub struct Caller {
    pub user: CurrentUser,
    pub token: String,
}

impl Caller {
    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub raw: Vec<u8>,
}

/// One multipart part
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

impl TestContext {
    /// Creates a new test context on in-memory stores
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let assets = MemoryAssetStore::new("/assets");
        let config = Config::for_testing(TEST_SECRET);

        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(assets.clone()),
            config.clone(),
        );

        TestContext {
            app: build_router(state),
            store,
            assets,
            config,
        }
    }

    pub fn caller(&self, email: &str, role: Role) -> Caller {
        let user = CurrentUser::new(Uuid::new_v4(), email, role);
        let claims = Claims::new(user.id, user.email.clone(), role);
        let token = create_token(&claims, &self.config.jwt.secret).unwrap();
        Caller { user, token }
    }

    pub fn learner(&self) -> Caller {
        self.caller("learner@example.com", Role::Learner)
    }

    pub fn admin(&self) -> Caller {
        self.caller("admin@example.com", Role::Admin)
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let raw = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        let body = serde_json::from_slice(&raw).unwrap_or(Value::Null);

        TestResponse { status, body, raw }
    }

    pub async fn get(&self, uri: &str, caller: Option<&Caller>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(caller) = caller {
            builder = builder.header(header::AUTHORIZATION, caller.auth_header());
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn json(&self, method: &str, uri: &str, caller: &Caller, body: Value) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, caller.auth_header())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, caller: &Caller) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, caller.auth_header())
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn delete(&self, uri: &str, caller: &Caller) -> TestResponse {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .header(header::AUTHORIZATION, caller.auth_header())
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn multipart(&self, uri: &str, caller: &Caller, parts: &[Part<'_>]) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, caller.auth_header())
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    /// Creates a course through the API and returns its JSON
    pub async fn create_course(&self, admin: &Caller, slug: &str, title: &str) -> Value {
        let response = self
            .multipart(
                "/v1/courses",
                admin,
                &[
                    Part::Text("title", title),
                    Part::Text("description", "Learn by building"),
                    Part::Text("price_cents", "80000"),
                    Part::Text("slug", slug),
                    Part::File {
                        name: "banner",
                        file_name: "banner.png",
                        content_type: "image/png",
                        bytes: &[0x89, 0x50, 0x4E, 0x47],
                    },
                ],
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Submits a subscription request with a receipt and returns its JSON
    pub async fn submit(&self, learner: &Caller, course_id: &str) -> Value {
        let response = self
            .multipart(
                &format!("/v1/courses/{}/subscriptions", course_id),
                learner,
                &[receipt()],
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }
}

pub fn receipt() -> Part<'static> {
    Part::File {
        name: "receipt",
        file_name: "receipt.jpg",
        content_type: "image/jpeg",
        bytes: &[0xFF, 0xD8, 0xFF, 0xE0],
    }
}

/// Encodes parts as a `multipart/form-data` body
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
