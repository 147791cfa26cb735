/// Course endpoints
///
/// # Endpoints
///
/// - `GET /v1/courses` - List courses (public)
/// - `GET /v1/courses/:slug` - Assembled course outline (signed in)
/// - `POST /v1/courses` - Create course (admin, multipart)
/// - `PATCH /v1/courses/:id` - Update course (admin)
/// - `POST /v1/courses/:id/modules` - Add module (admin)
/// - `POST /v1/modules/:id/lessons` - Add lesson (admin)
/// - `POST /v1/courses/:id/resources` - Add resource (admin, multipart)

use super::multipart::read_form;
use super::{admin, caller, validate_request, MaybeUser};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use coursehub_shared::content::assembler::CourseOutline;
use coursehub_shared::content::catalog::{CourseUpdate, NewCourse, NewLesson, NewModule, NewResource};
use coursehub_shared::models::course::{Course, Lesson, Module, Resource};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Text fields of the create-course form
#[derive(Debug, Validate)]
pub struct CreateCourseForm {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub price_cents: i64,

    #[validate(length(min = 1, max = 100, message = "Slug must be 1-100 characters"))]
    pub slug: String,

    #[validate(url(message = "Community link must be a URL"))]
    pub community_url: Option<String>,

    #[validate(url(message = "Preview must be a URL"))]
    pub preview_url: Option<String>,
}

/// Update course request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub price_cents: Option<i64>,

    #[validate(length(min = 1, max = 100, message = "Slug must be 1-100 characters"))]
    pub slug: Option<String>,

    /// Empty string removes the link
    pub community_url: Option<String>,
}

/// Add module request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    /// Ordering key; omitted modules sort last
    pub order: Option<i64>,
}

/// Add lesson request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLessonRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(url(message = "Video must be a URL"))]
    pub video_url: String,

    pub order: Option<i64>,
}

/// Course outline response
///
/// The outline fields are flattened next to the caller's enrollment flag.
#[derive(Debug, Serialize)]
pub struct CourseOutlineResponse {
    #[serde(flatten)]
    pub outline: CourseOutline,

    /// Whether the caller is enrolled in the course
    pub enrolled: bool,
}

/// List courses
///
/// # Endpoint
///
/// ```text
/// GET /v1/courses
/// ```
pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Json<Vec<Course>>> {
    Ok(Json(state.catalog.list_courses().await?))
}

/// Assembled course outline
///
/// # Endpoint
///
/// ```text
/// GET /v1/courses/web-dev
/// Authorization: Bearer <jwt_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "course": { "id": "uuid", "slug": "web-dev", "...": "..." },
///   "modules": [
///     { "id": "uuid", "title": "HTML Basics", "order": 1, "lessons": [] }
///   ],
///   "resources": [],
///   "enrolled": false
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: No bearer token
/// - `404 Not Found`: Unknown slug
/// - `503 Service Unavailable`: A content query failed
pub async fn get_course_outline(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<CourseOutlineResponse>> {
    let viewer = caller(&user);
    let outline = state.assembler.assemble(viewer, &slug).await?;

    let enrolled = match viewer {
        Some(viewer) => state
            .enrollments
            .is_enrolled(viewer.id, outline.course.id)
            .await?,
        None => false,
    };

    Ok(Json(CourseOutlineResponse { outline, enrolled }))
}

/// Create course
///
/// # Endpoint
///
/// ```text
/// POST /v1/courses
/// Authorization: Bearer <admin_jwt_token>
/// Content-Type: multipart/form-data
///
/// title, description, price_cents, slug, community_url?, preview_url?, banner (file)
/// ```
///
/// # Errors
///
/// - `401 Unauthorized` / `403 Forbidden`: Not an administrator
/// - `422 Unprocessable Entity`: Invalid fields, missing banner, slug taken
/// - `502 Bad Gateway`: Banner upload failed
pub async fn create_course(
    State(state): State<AppState>,
    user: MaybeUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Course>)> {
    let admin = admin(&user)?;
    let mut form = read_form(multipart).await?;

    let fields = CreateCourseForm {
        title: form.text_or_empty("title"),
        description: form.text_or_empty("description"),
        price_cents: form
            .number("price_cents")?
            .ok_or_else(|| ApiError::invalid("price_cents", "Price is required"))?,
        slug: form.text_or_empty("slug"),
        community_url: form.text("community_url").map(str::to_string),
        preview_url: form.text("preview_url").map(str::to_string),
    };
    validate_request(&fields)?;

    let banner = form
        .take_file("banner")
        .ok_or_else(|| ApiError::invalid("banner", "Banner image is required"))?;

    let course = state
        .catalog
        .create_course(
            &admin,
            NewCourse {
                title: fields.title,
                description: fields.description,
                price_cents: fields.price_cents,
                slug: fields.slug,
                community_url: fields.community_url,
                preview_url: fields.preview_url,
            },
            banner,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// Update course
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/courses/:id
/// Authorization: Bearer <admin_jwt_token>
///
/// { "title": "Modern Web Development", "price_cents": 95000 }
/// ```
pub async fn update_course(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(course_id): Path<Uuid>,
    Json(req): Json<UpdateCourseRequest>,
) -> ApiResult<Json<Course>> {
    let admin = admin(&user)?;
    validate_request(&req)?;

    let course = state
        .catalog
        .update_course(
            &admin,
            course_id,
            CourseUpdate {
                title: req.title,
                description: req.description,
                price_cents: req.price_cents,
                slug: req.slug,
                community_url: req.community_url,
            },
        )
        .await?;

    Ok(Json(course))
}

/// Add module
///
/// # Endpoint
///
/// ```text
/// POST /v1/courses/:id/modules
/// Authorization: Bearer <admin_jwt_token>
///
/// { "title": "HTML Basics", "order": 1 }
/// ```
pub async fn add_module(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(course_id): Path<Uuid>,
    Json(req): Json<CreateModuleRequest>,
) -> ApiResult<(StatusCode, Json<Module>)> {
    let admin = admin(&user)?;
    validate_request(&req)?;

    let module = state
        .catalog
        .add_module(
            &admin,
            course_id,
            NewModule {
                title: req.title,
                order: req.order,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(module)))
}

/// Add lesson
///
/// # Endpoint
///
/// ```text
/// POST /v1/modules/:id/lessons
/// Authorization: Bearer <admin_jwt_token>
///
/// { "title": "Tags", "video_url": "https://videos.example.com/tags.mp4", "order": 1 }
/// ```
pub async fn add_lesson(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(module_id): Path<Uuid>,
    Json(req): Json<CreateLessonRequest>,
) -> ApiResult<(StatusCode, Json<Lesson>)> {
    let admin = admin(&user)?;
    validate_request(&req)?;

    let lesson = state
        .catalog
        .add_lesson(
            &admin,
            module_id,
            NewLesson {
                title: req.title,
                video_url: req.video_url,
                order: req.order,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(lesson)))
}

/// Add resource
///
/// # Endpoint
///
/// ```text
/// POST /v1/courses/:id/resources
/// Authorization: Bearer <admin_jwt_token>
/// Content-Type: multipart/form-data
///
/// title, file_type?, file (file)
/// ```
pub async fn add_resource(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(course_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Resource>)> {
    let admin = admin(&user)?;
    let mut form = read_form(multipart).await?;

    let title = form
        .text("title")
        .map(str::to_string)
        .ok_or_else(|| ApiError::invalid("title", "Title is required"))?;
    let file = form
        .take_file("file")
        .ok_or_else(|| ApiError::invalid("file", "A file is required"))?;

    let resource = state
        .catalog
        .add_resource(
            &admin,
            course_id,
            NewResource {
                title,
                file_type: form.text_or_empty("file_type"),
            },
            file,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(resource)))
}
