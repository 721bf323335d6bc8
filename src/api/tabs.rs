//! Storefront tab API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{require_admin, require_auth, response_cache, ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{Tab, TabInput};

/// Routes under `/api/tabs`
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", axum::routing::post(create_tab))
        .route("/{id}", axum::routing::put(update_tab).delete(delete_tab))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/", get(list_tabs))
        .route("/{id}", get(get_tab))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// Routes under `/api/public/tabs`
pub fn public_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_tabs))
        .route("/{id}", get(get_tab))
        .route_layer(middleware::from_fn_with_state(state, response_cache))
}

async fn list_tabs(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Tab>>>, ApiError> {
    Ok(Json(ApiResponse::list(state.tab_service.list(false).await?)))
}

async fn get_tab(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<Tab>>, ApiError> {
    Ok(Json(ApiResponse::data(state.tab_service.get(id).await?)))
}

async fn create_tab(
    State(state): State<AppState>,
    Json(body): Json<TabInput>,
) -> Result<(StatusCode, Json<ApiResponse<Tab>>), ApiError> {
    let tab = state.tab_service.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(tab).with_message("Tab created successfully")),
    ))
}

async fn update_tab(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<TabInput>,
) -> Result<Json<ApiResponse<Tab>>, ApiError> {
    let tab = state.tab_service.update(id, body).await?;
    Ok(Json(ApiResponse::data(tab).with_message("Tab updated successfully")))
}

async fn delete_tab(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.tab_service.delete(id).await?;
    Ok(Json(ApiResponse::message("Tab deleted successfully")))
}
