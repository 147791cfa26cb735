/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use coursehub_api::{app::AppState, config::Config};
/// use coursehub_shared::assets::memory::MemoryAssetStore;
/// use coursehub_shared::store::memory::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MemoryAssetStore::default()),
///     config,
/// );
/// let app = coursehub_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use coursehub_shared::{
    assets::AssetStore,
    auth::{jwt, CurrentUser},
    content::{assembler::HierarchyAssembler, catalog::CourseCatalog},
    enrollment::EnrollmentRegistry,
    store::DocumentStore,
    subscriptions::SubscriptionManager,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every member is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Document store backing every service
    pub store: Arc<dyn DocumentStore>,

    /// Uploaded file storage
    pub assets: Arc<dyn AssetStore>,

    /// Course outline assembly
    pub assembler: HierarchyAssembler,

    /// Course authoring
    pub catalog: CourseCatalog,

    /// Enrollment lookups
    pub enrollments: EnrollmentRegistry,

    /// Subscription review workflow
    pub subscriptions: SubscriptionManager,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state wiring every service to the same stores
    pub fn new(store: Arc<dyn DocumentStore>, assets: Arc<dyn AssetStore>, config: Config) -> Self {
        Self {
            assembler: HierarchyAssembler::new(store.clone()),
            catalog: CourseCatalog::new(store.clone(), assets.clone()),
            enrollments: EnrollmentRegistry::new(store.clone()),
            subscriptions: SubscriptionManager::new(store.clone(), assets.clone()),
            store,
            assets,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # Health check (public)
/// ├── /assets/*path                        # Uploaded files (public)
/// └── /v1/                                 # API v1 (versioned)
///     ├── GET    /courses                  # Course list (public)
///     ├── POST   /courses                  # Create course (admin, multipart)
///     ├── GET    /courses/:slug            # Course outline (signed in)
///     ├── PATCH  /courses/:id              # Update course (admin)
///     ├── POST   /courses/:id/modules      # Add module (admin)
///     ├── POST   /courses/:id/resources    # Add resource (admin, multipart)
///     ├── POST   /courses/:id/subscriptions # Submit request (signed in, multipart)
///     ├── POST   /modules/:id/lessons      # Add lesson (admin)
///     ├── /me/
///     │   ├── POST /profile
///     │   ├── GET  /subscriptions
///     │   └── GET  /courses
///     └── /admin/subscriptions/
///         ├── GET    /                     # ?status=pending|approved|rejected
///         ├── GET    /:id
///         ├── POST   /:id/approve
///         ├── POST   /:id/reject
///         └── DELETE /:id                  # ?confirm=true
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Body limit for multipart uploads
/// 4. Bearer identification on `/v1` (anonymous requests pass through)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let course_routes = Router::new()
        .route(
            "/",
            get(routes::courses::list_courses).post(routes::courses::create_course),
        )
        .route(
            "/:course",
            get(routes::courses::get_course_outline).patch(routes::courses::update_course),
        )
        .route("/:course/modules", post(routes::courses::add_module))
        .route("/:course/resources", post(routes::courses::add_resource))
        .route(
            "/:course/subscriptions",
            post(routes::subscriptions::submit_subscription),
        );

    let module_routes = Router::new().route("/:module/lessons", post(routes::courses::add_lesson));

    let me_routes = Router::new()
        .route("/profile", post(routes::subscriptions::save_profile))
        .route("/subscriptions", get(routes::subscriptions::my_subscriptions))
        .route("/courses", get(routes::subscriptions::my_courses));

    let admin_routes = Router::new()
        .route("/subscriptions", get(routes::admin::list_subscriptions))
        .route(
            "/subscriptions/:id",
            get(routes::admin::get_subscription).delete(routes::admin::delete_subscription),
        )
        .route("/subscriptions/:id/approve", post(routes::admin::approve_subscription))
        .route("/subscriptions/:id/reject", post(routes::admin::reject_subscription));

    let v1_routes = Router::new()
        .nest("/courses", course_routes)
        .nest("/modules", module_routes)
        .nest("/me", me_routes)
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_identify_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(state.config.api.production)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/assets/*path", get(routes::assets::serve_asset))
        .nest("/v1", v1_routes)
        .layer(DefaultBodyLimit::max(state.config.api.max_upload_bytes))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Bearer identification middleware layer
///
/// Validates the JWT in the Authorization header when one is present and
/// injects the resulting [`CurrentUser`] into request extensions. Requests
/// without the header continue anonymously; handlers decide whether a user
/// is required. A malformed or invalid token is rejected outright.
async fn jwt_identify_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::BadRequest("Invalid authorization header".to_string()))?,
        None => return Ok(next.run(req).await),
    };

    // Parse Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_token(token, state.jwt_secret())?;
    let user: CurrentUser = claims.current_user();
    tracing::debug!(user_id = %user.id, role = %user.role, "Identified caller");

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
