//! Wishlist API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{require_auth, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ApiResponse;
use crate::models::{AddItemInput, UpdateQuantityInput, WishlistView};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistStatus {
    pub success: bool,
    pub in_wishlist: bool,
}

/// Routes under `/api/wishlist`
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_wishlist).post(add_to_wishlist).delete(clear_wishlist))
        .route("/check/{product_id}", get(check_status))
        .route("/{product_id}", put(update_item).delete(remove_item))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn get_wishlist(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ApiResponse<WishlistView>>, ApiError> {
    Ok(Json(ApiResponse::data(state.wishlist_service.get(&user.email).await?)))
}

/// POST /api/wishlist; re-adding a product sets its quantity
async fn add_to_wishlist(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<AddItemInput>,
) -> Result<(StatusCode, Json<ApiResponse<WishlistView>>), ApiError> {
    let (wishlist, existed) = state
        .wishlist_service
        .add(&user.email, body.product_id, body.quantity)
        .await?;

    let (status, message) = if existed {
        (StatusCode::OK, "Wishlist item updated successfully")
    } else {
        (StatusCode::CREATED, "Item added to wishlist successfully")
    };
    Ok((status, Json(ApiResponse::data(wishlist).with_message(message))))
}

async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(product_id): Path<i64>,
    Json(body): Json<UpdateQuantityInput>,
) -> Result<Json<ApiResponse<WishlistView>>, ApiError> {
    let wishlist = state
        .wishlist_service
        .update_quantity(&user.email, product_id, body.quantity)
        .await?;
    Ok(Json(
        ApiResponse::data(wishlist).with_message("Wishlist item updated successfully"),
    ))
}

async fn remove_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<WishlistView>>, ApiError> {
    let wishlist = state.wishlist_service.remove(&user.email, product_id).await?;
    Ok(Json(
        ApiResponse::data(wishlist).with_message("Item removed from wishlist successfully"),
    ))
}

async fn clear_wishlist(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.wishlist_service.clear(&user.email).await?;
    Ok(Json(ApiResponse::message("Wishlist cleared successfully")))
}

/// GET /api/wishlist/check/{product_id}
async fn check_status(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(product_id): Path<i64>,
) -> Result<Json<WishlistStatus>, ApiError> {
    let in_wishlist = state.wishlist_service.contains(&user.email, product_id).await?;
    Ok(Json(WishlistStatus {
        success: true,
        in_wishlist,
    }))
}
