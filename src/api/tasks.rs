//! Task API endpoints
//!
//! Every route needs a signed-in user; the service enforces ownership.

use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{parse_enum, ApiJson, ApiPath, ApiQuery, ListQuery};
use crate::api::middleware::{self, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{created, deleted, list, ok, ApiResult, DataResponse, Empty, ListResponse};
use crate::models::{
    CreateChecklistItemInput, CreateTaskInput, Task, TaskFilter, TaskPriority, TaskStatus, UpdateChecklistItemInput,
    UpdateTaskInput,
};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/{id}", get(get_task).put(update_task).delete(delete_task))
        .route("/{id}/checklist", post(add_item))
        .route("/{id}/checklist/{item_id}", put(update_item).delete(delete_item))
        .route_layer(axum_middleware::from_fn_with_state(state, middleware::require_auth))
}

type Created = Result<(StatusCode, Json<DataResponse<Task>>), ApiError>;

async fn list_tasks(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<Task>>, ApiError> {
    let filter = TaskFilter {
        search: query.search.clone(),
        status: parse_enum(query.status.as_deref(), "status", TaskStatus::parse)?,
        priority: parse_enum(query.priority.as_deref(), "priority", TaskPriority::parse)?,
        user_id: None,
    };

    let page = state
        .task_service
        .list(filter, query.sort(), &query.params(), &user.0)
        .await?;
    Ok(list(page))
}

async fn get_task(State(state): State<AppState>, user: AuthenticatedUser, ApiPath(id): ApiPath<i64>) -> ApiResult<Task> {
    Ok(ok(state.task_service.get(id, &user.0).await?))
}

async fn create_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateTaskInput>,
) -> Created {
    Ok(created(state.task_service.create(body, &user.0).await?))
}

async fn update_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateTaskInput>,
) -> ApiResult<Task> {
    Ok(ok(state.task_service.update(id, body, &user.0).await?))
}

async fn delete_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Empty> {
    state.task_service.delete(id, &user.0).await?;
    Ok(deleted())
}

async fn add_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CreateChecklistItemInput>,
) -> Created {
    Ok(created(state.task_service.add_item(id, body, &user.0).await?))
}

async fn update_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath((id, item_id)): ApiPath<(i64, i64)>,
    ApiJson(body): ApiJson<UpdateChecklistItemInput>,
) -> ApiResult<Task> {
    Ok(ok(state.task_service.update_item(id, item_id, body, &user.0).await?))
}

async fn delete_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath((id, item_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Task> {
    Ok(ok(state.task_service.delete_item(id, item_id, &user.0).await?))
}
