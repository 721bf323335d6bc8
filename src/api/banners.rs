//! Banner API endpoints
//!
//! Management under `/api/banners` is admin-only; the storefront reads
//! active banners from `/api/public/banners`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{require_admin, require_auth, response_cache, ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{Banner, BannerInput};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_banners).post(create_banner))
        .route("/{id}", get(get_banner).put(update_banner).delete(delete_banner))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

pub fn public_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_public_banners))
        .route_layer(middleware::from_fn_with_state(state, response_cache))
}

async fn list_banners(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Banner>>>, ApiError> {
    Ok(Json(ApiResponse::list(state.banner_service.list().await?)))
}

async fn list_public_banners(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Banner>>>, ApiError> {
    Ok(Json(ApiResponse::list(state.banner_service.list_public().await?)))
}

async fn get_banner(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<Banner>>, ApiError> {
    Ok(Json(ApiResponse::data(state.banner_service.get(id).await?)))
}

async fn create_banner(
    State(state): State<AppState>,
    Json(body): Json<BannerInput>,
) -> Result<(StatusCode, Json<ApiResponse<Banner>>), ApiError> {
    let banner = state.banner_service.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(banner).with_message("Banner created successfully")),
    ))
}

async fn update_banner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<BannerInput>,
) -> Result<Json<ApiResponse<Banner>>, ApiError> {
    let banner = state.banner_service.update(id, body).await?;
    Ok(Json(ApiResponse::data(banner).with_message("Banner updated successfully")))
}

async fn delete_banner(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.banner_service.delete(id).await?;
    Ok(Json(ApiResponse::message("Banner deleted successfully")))
}
