//! Subcategory API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{require_admin, require_auth, response_cache, ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{SubCategory, SubCategoryInput};

type SubCategoryList = Json<ApiResponse<Vec<SubCategory>>>;

/// Routes under `/api/subcategories`
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", axum::routing::post(create_sub_category))
        .route(
            "/{id}",
            axum::routing::put(update_sub_category).delete(delete_sub_category),
        )
        .route_layer(middleware::from_fn(require_admin));

    read_routes()
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// Routes under `/api/public/subcategories`
pub fn public_router(state: AppState) -> Router<AppState> {
    read_routes().route_layer(middleware::from_fn_with_state(state, response_cache))
}

fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sub_categories))
        .route("/category/{name}", get(list_by_category))
        .route("/{id}", get(get_sub_category))
}

async fn list_sub_categories(State(state): State<AppState>) -> Result<SubCategoryList, ApiError> {
    Ok(Json(ApiResponse::list(state.sub_category_service.list().await?)))
}

/// Active subcategories of a category
async fn list_by_category(State(state): State<AppState>, Path(name): Path<String>) -> Result<SubCategoryList, ApiError> {
    Ok(Json(ApiResponse::list(
        state.sub_category_service.list_active_by_category(&name).await?,
    )))
}

async fn get_sub_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SubCategory>>, ApiError> {
    Ok(Json(ApiResponse::data(state.sub_category_service.get(id).await?)))
}

async fn create_sub_category(
    State(state): State<AppState>,
    Json(body): Json<SubCategoryInput>,
) -> Result<(StatusCode, Json<ApiResponse<SubCategory>>), ApiError> {
    let sub = state.sub_category_service.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(sub).with_message("SubCategory created successfully")),
    ))
}

async fn update_sub_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SubCategoryInput>,
) -> Result<Json<ApiResponse<SubCategory>>, ApiError> {
    let sub = state.sub_category_service.update(id, body).await?;
    Ok(Json(ApiResponse::data(sub).with_message("SubCategory updated successfully")))
}

async fn delete_sub_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.sub_category_service.delete(id).await?;
    Ok(Json(ApiResponse::message("SubCategory deleted successfully")))
}
