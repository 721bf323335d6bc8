//! Cart API endpoints
//!
//! Every route acts on the cart of the signed-in user, keyed by email.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Json, Router,
};

use crate::api::middleware::{require_auth, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{ApiResponse, CartResponse, CountResponse};
use crate::models::{AddItemInput, CartView, UpdateQuantityInput};

/// Routes under `/api/cart`
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/count", get(cart_count))
        .route("/{product_id}", put(update_item).delete(remove_item))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// GET /api/cart
async fn get_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ApiResponse<CartView>>, ApiError> {
    Ok(Json(ApiResponse::data(state.cart_service.get(&user.email).await?)))
}

/// POST /api/cart
async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<AddItemInput>,
) -> Result<(StatusCode, Json<CartResponse<CartView>>), ApiError> {
    let result = state
        .cart_service
        .add(&user.email, body.product_id, body.quantity)
        .await?;

    let message = if result.merged {
        "Cart item quantity updated successfully"
    } else {
        "Item added to cart successfully"
    };
    Ok((
        StatusCode::CREATED,
        Json(CartResponse {
            success: true,
            message: message.to_string(),
            data: Some(result.cart),
            cart_count: result.cart_count,
        }),
    ))
}

/// PUT /api/cart/{product_id}
async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(product_id): Path<i64>,
    Json(body): Json<UpdateQuantityInput>,
) -> Result<Json<CartResponse<CartView>>, ApiError> {
    let cart = state
        .cart_service
        .update_quantity(&user.email, product_id, body.quantity)
        .await?;
    Ok(Json(CartResponse {
        success: true,
        message: "Cart item updated successfully".to_string(),
        cart_count: cart.totals.total_items,
        data: Some(cart),
    }))
}

/// DELETE /api/cart/{product_id}
async fn remove_item(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(product_id): Path<i64>,
) -> Result<Json<CartResponse<CartView>>, ApiError> {
    let cart = state.cart_service.remove(&user.email, product_id).await?;
    Ok(Json(CartResponse {
        success: true,
        message: "Item removed from cart successfully".to_string(),
        cart_count: cart.totals.total_items,
        data: Some(cart),
    }))
}

/// DELETE /api/cart
async fn clear_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<CartResponse<CartView>>, ApiError> {
    state.cart_service.clear(&user.email).await?;
    Ok(Json(CartResponse {
        success: true,
        message: "Cart cleared successfully".to_string(),
        data: None,
        cart_count: 0,
    }))
}

/// GET /api/cart/count
async fn cart_count(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.cart_service.count(&user.email).await?;
    Ok(Json(CountResponse { success: true, count }))
}
