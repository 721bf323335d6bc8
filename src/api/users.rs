//! User API endpoints
//!
//! All routes require a session. Listing, creating and deleting accounts is
//! admin-only; reading and editing an account or its details is allowed for
//! the account itself or an admin.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{require_admin, require_auth, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ApiResponse;
use crate::models::{UpdateUserDetailsInput, UpdateUserInput, User, UserDetails};
use crate::services::CreateUserInput;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsCompleteResponse {
    pub success: bool,
    pub details_complete: bool,
}

pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", axum::routing::delete(delete_user))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/{id}", get(get_user).put(update_user))
        .route("/details/{email}", get(get_details).put(update_details))
        .route("/details/{email}/complete", get(details_complete))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// GET /api/users
async fn list_users(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let users = state.user_service.list_users().await?;
    Ok(Json(ApiResponse::list(users)))
}

/// POST /api/users
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let user = state.user_service.create_user(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(user).with_message("User created successfully")),
    ))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state.user_service.get_user(&actor, id).await?;
    Ok(Json(ApiResponse::data(user)))
}

/// PUT /api/users/{id}
async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserInput>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state.user_service.update_user(&actor, id, body).await?;
    Ok(Json(ApiResponse::data(user).with_message("User updated successfully")))
}

/// DELETE /api/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.user_service.delete_user(id).await?;
    Ok(Json(ApiResponse::message("User deleted successfully")))
}

/// GET /api/users/details/{email}
async fn get_details(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(email): Path<String>,
) -> Result<Json<ApiResponse<UserDetails>>, ApiError> {
    let details = state.user_service.get_details(&actor, &email).await?;
    Ok(Json(ApiResponse::data(details)))
}

/// GET /api/users/details/{email}/complete
async fn details_complete(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(email): Path<String>,
) -> Result<Json<DetailsCompleteResponse>, ApiError> {
    let details_complete = state.user_service.details_complete(&actor, &email).await?;
    Ok(Json(DetailsCompleteResponse {
        success: true,
        details_complete,
    }))
}

/// PUT /api/users/details/{email}
async fn update_details(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(email): Path<String>,
    Json(body): Json<UpdateUserDetailsInput>,
) -> Result<Json<ApiResponse<UserDetails>>, ApiError> {
    let details = state.user_service.update_details(&actor, &email, body).await?;
    Ok(Json(
        ApiResponse::data(details).with_message("User details updated successfully"),
    ))
}
