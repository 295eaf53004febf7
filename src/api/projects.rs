//! Project API endpoints
//!
//! Reads are public; writes and posts need an admin.

use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::common::{parse_enum, ApiJson, ApiPath, ApiQuery, ListQuery};
use crate::api::middleware::{self, ApiError, AppState};
use crate::api::responses::{created, deleted, list, ok, ApiResult, DataResponse, Empty, ListResponse};
use crate::models::{
    CreateProjectInput, CreateProjectPostInput, ProgressStatus, Project, ProjectFilter, UpdateProjectInput,
};

pub fn router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", post(create_project))
        .route("/{id}", put(update_project).delete(delete_project))
        .route("/{id}/posts", post(add_post))
        .route("/{id}/posts/{post_id}", delete(delete_post))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(state, middleware::require_auth));

    Router::new()
        .route("/", get(list_projects))
        .route("/{id}", get(get_project))
        .merge(admin_routes)
}

async fn list_projects(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<Project>>, ApiError> {
    let filter = ProjectFilter {
        search: query.search.clone(),
        category: query.category.clone(),
        status: parse_enum(query.status.as_deref(), "status", ProgressStatus::parse)?,
        featured: query.featured(),
        technology: query.technology.clone(),
    };

    let page = state.project_service.list(&filter, query.sort(), &query.params()).await?;
    Ok(list(page))
}

async fn get_project(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Project> {
    Ok(ok(state.project_service.get(id).await?))
}

async fn create_project(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateProjectInput>,
) -> Result<(StatusCode, Json<DataResponse<Project>>), ApiError> {
    let project = state.project_service.create(body).await?;
    Ok(created(project))
}

async fn update_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateProjectInput>,
) -> ApiResult<Project> {
    Ok(ok(state.project_service.update(id, body).await?))
}

async fn delete_project(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Empty> {
    state.project_service.delete(id).await?;
    Ok(deleted())
}

async fn add_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CreateProjectPostInput>,
) -> Result<(StatusCode, Json<DataResponse<Project>>), ApiError> {
    let project = state.project_service.add_post(id, body).await?;
    Ok(created(project))
}

async fn delete_post(
    State(state): State<AppState>,
    ApiPath((id, post_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Project> {
    Ok(ok(state.project_service.delete_post(id, post_id).await?))
}
