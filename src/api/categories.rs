//! Category API endpoints
//!
//! - /api/categories: reads for any session, writes for admins
//! - /api/public/categories: cached public reads

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{require_admin, require_auth, response_cache, ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{Category, CategoryInput};

pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", axum::routing::post(create_category))
        .route("/{id}", axum::routing::put(update_category).delete(delete_category))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/", get(list_categories))
        .route("/{id}", get(get_category))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

pub fn public_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{id}", get(get_category))
        .route_layer(middleware::from_fn_with_state(state, response_cache))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Category>>>, ApiError> {
    Ok(Json(ApiResponse::list(state.category_service.list().await?)))
}

async fn get_category(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<Category>>, ApiError> {
    Ok(Json(ApiResponse::data(state.category_service.get(id).await?)))
}

async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CategoryInput>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), ApiError> {
    let category = state.category_service.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(category).with_message("Category created successfully")),
    ))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryInput>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let category = state.category_service.update(id, body).await?;
    Ok(Json(ApiResponse::data(category).with_message("Category updated successfully")))
}

async fn delete_category(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.category_service.delete(id).await?;
    Ok(Json(ApiResponse::message("Category deleted successfully")))
}
