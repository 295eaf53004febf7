//! Motivation API endpoints
//!
//! - GET /api/motivations - List
//! - GET /api/motivations/random - One random entry
//! - GET /api/motivations/{id} - Get, counting the view
//! - PUT /api/motivations/{id}/like, /{id}/share - Engagement counters
//! - POST, PUT /{id}, DELETE /{id} - Admin writes

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
use crate::models::{CreateMotivationInput, Motivation, MotivationFilter, MotivationKind, UpdateMotivationInput};

pub fn router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", post(create_motivation))
        .route("/{id}", put(update_motivation).delete(delete_motivation))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(state, middleware::require_auth));

    Router::new()
        .route("/", get(list_motivations))
        // static segment wins over {id}
        .route("/random", get(random_motivation))
        .route("/{id}", get(get_motivation))
        .route("/{id}/like", put(like_motivation))
        .route("/{id}/share", put(share_motivation))
        .merge(admin_routes)
}

async fn list_motivations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ListResponse<Motivation>>, ApiError> {
    let filter = MotivationFilter {
        search: query.search.clone(),
        kind: parse_enum(query.kind(), "type", MotivationKind::parse)?,
        tag: query.tag.clone(),
    };

    let page = state
        .motivation_service
        .list(&filter, query.sort(), &query.params())
        .await?;
    Ok(list(page))
}

async fn random_motivation(State(state): State<AppState>) -> ApiResult<Motivation> {
    Ok(ok(state.motivation_service.random().await?))
}

async fn get_motivation(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Motivation> {
    Ok(ok(state.motivation_service.view(id).await?))
}

async fn like_motivation(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Motivation> {
    Ok(ok(state.motivation_service.like(id).await?))
}

async fn share_motivation(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Motivation> {
    Ok(ok(state.motivation_service.share(id).await?))
}

async fn create_motivation(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateMotivationInput>,
) -> Result<(StatusCode, Json<DataResponse<Motivation>>), ApiError> {
    Ok(created(state.motivation_service.create(body).await?))
}

async fn update_motivation(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateMotivationInput>,
) -> ApiResult<Motivation> {
    Ok(ok(state.motivation_service.update(id, body).await?))
}

async fn delete_motivation(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Empty> {
    state.motivation_service.delete(id).await?;
    Ok(deleted())
}
