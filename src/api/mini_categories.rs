//! Minicategory API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{require_admin, require_auth, response_cache, ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{MiniCategory, MiniCategoryInput};

type MiniCategoryList = Json<ApiResponse<Vec<MiniCategory>>>;

/// Routes under `/api/minicategories`
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", axum::routing::post(create_mini_category))
        .route(
            "/{id}",
            axum::routing::put(update_mini_category).delete(delete_mini_category),
        )
        .route_layer(middleware::from_fn(require_admin));

    read_routes()
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// Routes under `/api/public/minicategories`
pub fn public_router(state: AppState) -> Router<AppState> {
    read_routes().route_layer(middleware::from_fn_with_state(state, response_cache))
}

fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_mini_categories))
        .route(
            "/category/{category}/subcategory/{sub_category}",
            get(list_by_parent),
        )
        .route("/{id}", get(get_mini_category))
}

async fn list_mini_categories(State(state): State<AppState>) -> Result<MiniCategoryList, ApiError> {
    Ok(Json(ApiResponse::list(state.mini_category_service.list().await?)))
}

async fn list_by_parent(
    State(state): State<AppState>,
    Path((category, sub_category)): Path<(String, String)>,
) -> Result<MiniCategoryList, ApiError> {
    Ok(Json(ApiResponse::list(
        state
            .mini_category_service
            .list_active_by_parent(&category, &sub_category)
            .await?,
    )))
}

async fn get_mini_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MiniCategory>>, ApiError> {
    Ok(Json(ApiResponse::data(state.mini_category_service.get(id).await?)))
}

async fn create_mini_category(
    State(state): State<AppState>,
    Json(body): Json<MiniCategoryInput>,
) -> Result<(StatusCode, Json<ApiResponse<MiniCategory>>), ApiError> {
    let mini = state.mini_category_service.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(mini).with_message("MiniCategory created successfully")),
    ))
}

async fn update_mini_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<MiniCategoryInput>,
) -> Result<Json<ApiResponse<MiniCategory>>, ApiError> {
    let mini = state.mini_category_service.update(id, body).await?;
    Ok(Json(ApiResponse::data(mini).with_message("MiniCategory updated successfully")))
}

async fn delete_mini_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.mini_category_service.delete(id).await?;
    Ok(Json(ApiResponse::message("MiniCategory deleted successfully")))
}
