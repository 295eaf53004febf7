//! Blog API endpoints
//!
//! - GET /api/blogs - List posts (drafts only for admins)
//! - GET /api/blogs/{id} - Get a post by id or slug, counting the view
//! - POST /api/blogs - Create (admin)
//! - PUT /api/blogs/{id} - Update (admin)
//! - DELETE /api/blogs/{id} - Delete (admin)
//! - PUT /api/blogs/{id}/like - Like
//! - POST /api/blogs/{id}/comments - Comment (signed in)
//! - DELETE /api/blogs/{id}/comments/{comment_id} - Remove a comment (author or admin)

use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::common::{parse_enum, ApiJson, ApiPath, ApiQuery, ListQuery};
use crate::api::middleware::{self, ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::api::responses::{created, deleted, list, ok, ApiResult, DataResponse, Empty, ListResponse};
use crate::models::{Blog, BlogFilter, BlogStatus, CreateBlogInput, CreateCommentInput, UpdateBlogInput};

pub fn router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", post(create_blog))
        .route("/{id}", put(update_blog).delete(delete_blog))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth));

    let member_routes = Router::new()
        .route("/{id}/comments", post(add_comment))
        .route("/{id}/comments/{comment_id}", delete(delete_comment))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .route("/", get(list_blogs))
        .route("/{id}", get(get_blog))
        .route("/{id}/like", put(like_blog))
        .route_layer(axum_middleware::from_fn_with_state(state, middleware::optional_auth))
        .merge(admin_routes)
        .merge(member_routes)
}

async fn list_blogs(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<Blog>>, ApiError> {
    let filter = BlogFilter {
        search: query.search.clone(),
        category: query.category.clone(),
        status: parse_enum(query.status.as_deref(), "status", BlogStatus::parse)?,
        featured: query.featured(),
        tag: query.tag.clone(),
        published_only: false,
    };

    let page = state
        .blog_service
        .list(filter, query.sort(), &query.params(), viewer.is_admin())
        .await?;
    Ok(list(page))
}

async fn get_blog(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(id_or_slug): ApiPath<String>,
) -> ApiResult<Blog> {
    let blog = state.blog_service.view(&id_or_slug, viewer.is_admin()).await?;
    Ok(ok(blog))
}

async fn like_blog(State(state): State<AppState>, viewer: MaybeUser, ApiPath(id): ApiPath<i64>) -> ApiResult<Blog> {
    let blog = state.blog_service.like(id, viewer.is_admin()).await?;
    Ok(ok(blog))
}

async fn create_blog(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateBlogInput>,
) -> Result<(StatusCode, Json<DataResponse<Blog>>), ApiError> {
    let blog = state.blog_service.create(body, Some(user.0.id)).await?;
    Ok(created(blog))
}

async fn update_blog(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateBlogInput>,
) -> ApiResult<Blog> {
    let blog = state.blog_service.update(id, body).await?;
    Ok(ok(blog))
}

async fn delete_blog(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Empty> {
    state.blog_service.delete(id).await?;
    Ok(deleted())
}

async fn add_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CreateCommentInput>,
) -> Result<(StatusCode, Json<DataResponse<Blog>>), ApiError> {
    let blog = state.blog_service.add_comment(id, &user.0, body).await?;
    Ok(created(blog))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath((id, comment_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Blog> {
    let blog = state.blog_service.delete_comment(id, comment_id, &user.0).await?;
    Ok(ok(blog))
}
