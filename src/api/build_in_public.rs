//! Build-in-public API endpoints
//!
//! Public reads; entries and milestones are edited by admins. Milestone
//! writes answer with the whole entry so clients see the new progress.

use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{parse_enum, ApiJson, ApiPath, ApiQuery, ListQuery};
use crate::api::middleware::{self, ApiError, AppState};
use crate::api::responses::{created, deleted, list, ok, ApiResult, DataResponse, Empty, ListResponse};
use crate::models::{
    BuildInPublic, BuildInPublicFilter, CreateBuildInPublicInput, CreateMilestoneInput, ProgressStatus,
    UpdateBuildInPublicInput, UpdateMilestoneInput,
};

pub fn router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", post(create_entry))
        .route("/{id}", put(update_entry).delete(delete_entry))
        .route("/{id}/milestones", post(add_milestone))
        .route("/{id}/milestones/{milestone_id}", put(update_milestone).delete(delete_milestone))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(state, middleware::require_auth));

    Router::new()
        .route("/", get(list_entries))
        .route("/{id}", get(get_entry))
        .merge(admin_routes)
}

type Created = Result<(StatusCode, Json<DataResponse<BuildInPublic>>), ApiError>;

async fn list_entries(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<BuildInPublic>>, ApiError> {
    let filter = BuildInPublicFilter {
        search: query.search.clone(),
        status: parse_enum(query.status.as_deref(), "status", ProgressStatus::parse)?,
        tag: query.tag.clone(),
    };

    let page = state
        .build_in_public_service
        .list(&filter, query.sort(), &query.params())
        .await?;
    Ok(list(page))
}

async fn get_entry(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<BuildInPublic> {
    Ok(ok(state.build_in_public_service.get(id).await?))
}

async fn create_entry(State(state): State<AppState>, ApiJson(body): ApiJson<CreateBuildInPublicInput>) -> Created {
    Ok(created(state.build_in_public_service.create(body).await?))
}

async fn update_entry(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateBuildInPublicInput>,
) -> ApiResult<BuildInPublic> {
    Ok(ok(state.build_in_public_service.update(id, body).await?))
}

async fn delete_entry(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Empty> {
    state.build_in_public_service.delete(id).await?;
    Ok(deleted())
}

async fn add_milestone(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CreateMilestoneInput>,
) -> Created {
    Ok(created(state.build_in_public_service.add_milestone(id, body).await?))
}

async fn update_milestone(
    State(state): State<AppState>,
    ApiPath((id, milestone_id)): ApiPath<(i64, i64)>,
    ApiJson(body): ApiJson<UpdateMilestoneInput>,
) -> ApiResult<BuildInPublic> {
    Ok(ok(state
        .build_in_public_service
        .update_milestone(id, milestone_id, body)
        .await?))
}

async fn delete_milestone(
    State(state): State<AppState>,
    ApiPath((id, milestone_id)): ApiPath<(i64, i64)>,
) -> ApiResult<BuildInPublic> {
    Ok(ok(state.build_in_public_service.delete_milestone(id, milestone_id).await?))
}
