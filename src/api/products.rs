//! Product API endpoints
//!
//! Public catalogue reads are served through the response cache; the full
//! listing needs a session and mutations need an admin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};

use crate::api::common::SearchQuery;
use crate::api::middleware::{require_admin, require_auth, response_cache, ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{CreateProductInput, ProductView, UpdateProductInput};

type ProductList = Json<ApiResponse<Vec<ProductView>>>;

/// Routes under `/api/products`
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", axum::routing::post(create_product))
        .route("/{id}", axum::routing::put(update_product).delete(delete_product))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let protected = Router::new()
        .route("/admin/all", get(list_all_products))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(list_products))
        .route("/new", get(list_new_products))
        .route("/category/{name}", get(list_by_category))
        .route("/tag/{name}", get(list_by_tag))
        .route("/{id}", get(get_product))
        .route_layer(middleware::from_fn_with_state(state, response_cache))
        .merge(protected)
        .merge(admin)
}

/// Routes under `/api/public/products`
pub fn public_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/search", get(search_products))
        .route_layer(middleware::from_fn_with_state(state, response_cache))
}

async fn list_products(State(state): State<AppState>) -> Result<ProductList, ApiError> {
    Ok(Json(ApiResponse::list(state.product_service.list_active().await?)))
}

async fn list_all_products(State(state): State<AppState>) -> Result<ProductList, ApiError> {
    Ok(Json(ApiResponse::list(state.product_service.list_all().await?)))
}

async fn list_new_products(State(state): State<AppState>) -> Result<ProductList, ApiError> {
    Ok(Json(ApiResponse::list(state.product_service.list_new().await?)))
}

async fn list_by_category(State(state): State<AppState>, Path(name): Path<String>) -> Result<ProductList, ApiError> {
    Ok(Json(ApiResponse::list(
        state.product_service.list_by_category(&name).await?,
    )))
}

async fn list_by_tag(State(state): State<AppState>, Path(name): Path<String>) -> Result<ProductList, ApiError> {
    Ok(Json(ApiResponse::list(state.product_service.list_by_tag(&name).await?)))
}

/// GET /api/public/products/search?q=
async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<ProductList, ApiError> {
    Ok(Json(ApiResponse::list(state.product_service.search(&query.q).await?)))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductView>>, ApiError> {
    Ok(Json(ApiResponse::data(state.product_service.get(id).await?)))
}

async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<ProductView>>), ApiError> {
    let product = state.product_service.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(product).with_message("Product created successfully")),
    ))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProductInput>,
) -> Result<Json<ApiResponse<ProductView>>, ApiError> {
    let product = state.product_service.update(id, body).await?;
    Ok(Json(ApiResponse::data(product).with_message("Product updated successfully")))
}

async fn delete_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.product_service.delete(id).await?;
    Ok(Json(ApiResponse::message("Product deleted successfully")))
}
