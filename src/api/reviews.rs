//! Review API endpoints
//!
//! Reading and posting reviews needs a session; the full listing and
//! moderation are admin-only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};

use crate::api::middleware::{require_admin, require_auth, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ApiResponse;
use crate::models::{CreateReviewInput, ProductReviews, Review, UpdateReviewInput};

/// Routes under `/api/reviews`
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(list_reviews))
        .route("/{id}", axum::routing::put(update_review).delete(delete_review))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/", axum::routing::post(create_review))
        .route("/product/{product_id}", get(list_for_product))
        .route("/{id}", get(get_review))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn list_reviews(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Review>>>, ApiError> {
    Ok(Json(ApiResponse::list(state.review_service.list().await?)))
}

/// GET /api/reviews/product/{product_id}
async fn list_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<ProductReviews>>, ApiError> {
    Ok(Json(ApiResponse::data(
        state.review_service.list_by_product(product_id).await?,
    )))
}

async fn get_review(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<Review>>, ApiError> {
    Ok(Json(ApiResponse::data(state.review_service.get(id).await?)))
}

/// POST /api/reviews; name and email default to the caller's
async fn create_review(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<CreateReviewInput>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>), ApiError> {
    let review = state.review_service.create(&user, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(review).with_message("Review created successfully")),
    ))
}

async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateReviewInput>,
) -> Result<Json<ApiResponse<Review>>, ApiError> {
    let review = state.review_service.update(id, body).await?;
    Ok(Json(ApiResponse::data(review).with_message("Review updated successfully")))
}

async fn delete_review(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.review_service.delete(id).await?;
    Ok(Json(ApiResponse::message("Review deleted successfully")))
}
