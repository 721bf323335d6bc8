//! Authentication API endpoints
//!
//! - POST /api/auth/register - Registration (the first account becomes admin)
//! - POST /api/auth/login - Login, returns a session token and sets the cookie
//! - POST /api/auth/logout - End the current session
//! - GET /api/auth/profile - Current user
//! - PUT /api/auth/update-password - Change password

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::{expired_session_cookie, session_cookie};
use crate::api::middleware::{extract_session_token, require_auth, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::ApiResponse;
use crate::models::User;
use crate::services::{ChangePasswordInput, LoginInput, RegisterInput};

/// Token plus the account it belongs to
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/update-password", put(update_password))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

fn cookie_headers(value: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(value).map_err(ApiError::internal_error)?,
    );
    Ok(headers)
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state.user_service.register(body).await?;

    let (session, user) = state.user_service.login(LoginInput::new(&user.email, password)).await?;
    let headers = cookie_headers(&session_cookie(&session.id, state.session_days))?;

    Ok((
        StatusCode::CREATED,
        headers,
        Json(
            ApiResponse::data(AuthResponse {
                user,
                token: session.id,
            })
            .with_message("User registered successfully"),
        ),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, user) = state.user_service.login(body).await?;
    tracing::debug!("User {} logged in", user.id);

    let headers = cookie_headers(&session_cookie(&session.id, state.session_days))?;
    Ok((
        headers,
        Json(
            ApiResponse::data(AuthResponse {
                user,
                token: session.id,
            })
            .with_message("Login successful"),
        ),
    ))
}

/// POST /api/auth/logout
async fn logout(State(state): State<AppState>, request: Request) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&request) {
        state.user_service.logout(&token).await?;
    }

    let headers = cookie_headers(expired_session_cookie())?;
    Ok((headers, Json(ApiResponse::message("Logged out successfully"))))
}

/// GET /api/auth/profile
async fn profile(AuthenticatedUser(user): AuthenticatedUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::data(user))
}

/// PUT /api/auth/update-password
async fn update_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<ChangePasswordInput>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.user_service.change_password(user.id, body).await?;
    Ok(Json(ApiResponse::message("Password updated successfully")))
}
