//! Hero slider API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{require_admin, require_auth, response_cache, ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{HeroSlider, HeroSliderInput};

/// Routes under `/api/hero-sliders`
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", axum::routing::post(create_slider))
        .route("/{id}", axum::routing::put(update_slider).delete(delete_slider))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/", get(list_all_sliders))
        .route("/{id}", get(get_slider))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// Routes under `/api/public/hero-sliders`; inactive sliders stay hidden
pub fn public_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_active_sliders))
        .route("/{id}", get(get_active_slider))
        .route_layer(middleware::from_fn_with_state(state, response_cache))
}

async fn list_all_sliders(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<HeroSlider>>>, ApiError> {
    Ok(Json(ApiResponse::list(state.hero_slider_service.list(false).await?)))
}

async fn list_active_sliders(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<HeroSlider>>>, ApiError> {
    Ok(Json(ApiResponse::list(state.hero_slider_service.list(true).await?)))
}

async fn get_slider(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<HeroSlider>>, ApiError> {
    Ok(Json(ApiResponse::data(state.hero_slider_service.get(id).await?)))
}

async fn get_active_slider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<HeroSlider>>, ApiError> {
    Ok(Json(ApiResponse::data(state.hero_slider_service.get_active(id).await?)))
}

async fn create_slider(
    State(state): State<AppState>,
    Json(body): Json<HeroSliderInput>,
) -> Result<(StatusCode, Json<ApiResponse<HeroSlider>>), ApiError> {
    let slider = state.hero_slider_service.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(slider).with_message("Hero slider created successfully")),
    ))
}

async fn update_slider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<HeroSliderInput>,
) -> Result<Json<ApiResponse<HeroSlider>>, ApiError> {
    let slider = state.hero_slider_service.update(id, body).await?;
    Ok(Json(ApiResponse::data(slider).with_message("Hero slider updated successfully")))
}

async fn delete_slider(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.hero_slider_service.delete(id).await?;
    Ok(Json(ApiResponse::message("Hero slider deleted successfully")))
}
