/// Post handlers - HTTP endpoints for post operations
use crate::config::Config;
use crate::error::Result;
use crate::models::{PostStatus, PostType};
use crate::services::tree::PostRequest;
use crate::services::PostService;
use crate::util::client_ip;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostBody {
    pub author_id: Uuid,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub content: String,
    pub tag_val: Option<String>,
    pub ptype: Option<PostType>,
    pub status: Option<PostStatus>,
    pub parent_id: Option<Uuid>,
    pub root_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditPostBody {
    pub editor_id: Uuid,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub content: String,
    pub tag_val: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
    pub status: PostStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub tag: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Create a new post; replies land in their parent's thread.
pub async fn create_post(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    body: web::Json<CreatePostBody>,
) -> Result<HttpResponse> {
    body.validate()?;

    let body = body.into_inner();
    let req = PostRequest {
        title: body.title.unwrap_or_default(),
        content: body.content,
        tag_val: body.tag_val.unwrap_or_default(),
        ptype: body.ptype,
        status: body.status,
        parent_id: body.parent_id,
        root_id: body.root_id,
        project_id: body.project_id,
    };

    let service = PostService::new((**pool).clone(), config.counters.view_window_minutes);
    let post = service.create_post(body.author_id, req).await?;

    Ok(HttpResponse::Created().json(post))
}

/// Get a single post and count the view when the client IP has not seen
/// it inside the dedup window.
pub async fn get_post(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    post_id: web::Path<Uuid>,
    http: HttpRequest,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), config.counters.view_window_minutes);
    let post = service.view_post(*post_id, &client_ip(&http)).await?;

    Ok(HttpResponse::Ok().json(post))
}

/// List top-level posts, optionally filtered by tag.
pub async fn list_posts(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), config.counters.view_window_minutes);
    let posts = service
        .list_top_level(query.tag.as_deref(), query.limit, query.offset)
        .await?;

    Ok(HttpResponse::Ok().json(posts))
}

/// Get every post in a thread, in display order.
pub async fn get_thread(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    root_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), config.counters.view_window_minutes);
    let posts = service.get_thread(*root_id).await?;

    Ok(HttpResponse::Ok().json(posts))
}

/// Edit a post's content (and title/tags for top-level posts).
pub async fn edit_post(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    post_id: web::Path<Uuid>,
    body: web::Json<EditPostBody>,
) -> Result<HttpResponse> {
    body.validate()?;

    let service = PostService::new((**pool).clone(), config.counters.view_window_minutes);
    let post = service
        .edit_post(
            *post_id,
            body.editor_id,
            body.title.as_deref(),
            &body.content,
            body.tag_val.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(post))
}

/// Soft-delete a post. The row stays; only its status changes.
pub async fn delete_post(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), config.counters.view_window_minutes);
    service.set_status(*post_id, PostStatus::Deleted).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Change a post's status. Closing or reopening an answer refreshes the
/// parent's reply count.
pub async fn set_post_status(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    post_id: web::Path<Uuid>,
    body: web::Json<SetStatusBody>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), config.counters.view_window_minutes);
    let post = service.set_status(*post_id, body.status).await?;

    Ok(HttpResponse::Ok().json(post))
}
