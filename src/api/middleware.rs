//! API middleware
//!
//! Contains middleware for:
//! - Authentication (session token from bearer header or cookie)
//! - Authorization (admin role)
//! - Request statistics
//! - Caching of public GET responses

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{Cache, CacheLayer, RESPONSE_PREFIX};
use crate::models::{User, UserRole};
use crate::services::{
    BannerService, BannerServiceError, CartService, CartServiceError, CategoryService, CategoryServiceError,
    HeroSliderService, HeroSliderServiceError, MiniCategoryService, NewsService, NewsServiceError,
    ProductService, ProductServiceError, ReviewService, ReviewServiceError, SubCategoryService, TabService,
    TabServiceError, UserService, UserServiceError, WishlistService, WishlistServiceError,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Sum of response times in microseconds
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.total_response_time_us.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Cache>,
    /// Lifetime of cached public responses
    pub response_ttl: Duration,
    pub session_days: i64,
    pub user_service: Arc<UserService>,
    pub product_service: Arc<ProductService>,
    pub cart_service: Arc<CartService>,
    pub wishlist_service: Arc<WishlistService>,
    pub review_service: Arc<ReviewService>,
    pub category_service: Arc<CategoryService>,
    pub sub_category_service: Arc<SubCategoryService>,
    pub mini_category_service: Arc<MiniCategoryService>,
    pub tab_service: Arc<TabService>,
    pub banner_service: Arc<BannerService>,
    pub hero_slider_service: Arc<HeroSliderService>,
    pub news_service: Arc<NewsService>,
    pub request_stats: Arc<RequestStats>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
///
/// Renders as `{"success": false, "message": .., "error": {"code": .., "message": ..}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            message: message.clone(),
            error: ApiErrorDetail {
                code: code.into(),
                message,
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// Log the cause and answer with a generic message
    pub fn internal_error(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {:#}", cause);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::NotFound => ApiError::not_found(e.to_string()),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<ProductServiceError> for ApiError {
    fn from(e: ProductServiceError) -> Self {
        match e {
            ProductServiceError::NotFound => ApiError::not_found(e.to_string()),
            ProductServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ProductServiceError::DuplicateSku => ApiError::conflict(e.to_string()),
            ProductServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<CartServiceError> for ApiError {
    fn from(e: CartServiceError) -> Self {
        match e {
            CartServiceError::NotFound(msg) => ApiError::not_found(msg),
            CartServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CartServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<WishlistServiceError> for ApiError {
    fn from(e: WishlistServiceError) -> Self {
        match e {
            WishlistServiceError::NotFound(msg) => ApiError::not_found(msg),
            WishlistServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            WishlistServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<ReviewServiceError> for ApiError {
    fn from(e: ReviewServiceError) -> Self {
        match e {
            ReviewServiceError::NotFound(msg) => ApiError::not_found(msg),
            ReviewServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ReviewServiceError::AlreadyReviewed => ApiError::conflict(e.to_string()),
            ReviewServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(msg) => ApiError::not_found(msg),
            CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CategoryServiceError::Duplicate(msg) => ApiError::conflict(msg),
            CategoryServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<TabServiceError> for ApiError {
    fn from(e: TabServiceError) -> Self {
        match e {
            TabServiceError::NotFound => ApiError::not_found(e.to_string()),
            TabServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            TabServiceError::DuplicateName => ApiError::conflict(e.to_string()),
            TabServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<BannerServiceError> for ApiError {
    fn from(e: BannerServiceError) -> Self {
        match e {
            BannerServiceError::NotFound(msg) => ApiError::not_found(msg),
            BannerServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            BannerServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<HeroSliderServiceError> for ApiError {
    fn from(e: HeroSliderServiceError) -> Self {
        match e {
            HeroSliderServiceError::NotFound => ApiError::not_found(e.to_string()),
            HeroSliderServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            HeroSliderServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<NewsServiceError> for ApiError {
    fn from(e: NewsServiceError) -> Self {
        match e {
            NewsServiceError::NotFound(msg) => ApiError::not_found(msg),
            NewsServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            NewsServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            NewsServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Extract session token from request
pub(crate) fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request).ok_or_else(|| ApiError::unauthorized("Access token required"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.0.role != UserRole::Admin {
        return Err(ApiError::forbidden("Admin access required"));
    }

    Ok(next.run(request).await)
}

/// Request statistics middleware
pub async fn request_stats_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}

// ============================================================================
// Response Cache
// ============================================================================

/// A successful JSON response kept in the cache
#[derive(Debug, Serialize, Deserialize)]
struct CachedBody {
    content_type: String,
    body: String,
}

/// Build Cache-Control header for public API responses
pub fn cache_control_public(max_age: u64) -> String {
    format!("public, max-age={}", max_age)
}

/// HTTP date `max_age` seconds from now
fn expires_header(max_age: u64) -> String {
    let expires = Utc::now() + chrono::Duration::seconds(max_age as i64);
    expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn add_cache_headers(response: &mut Response, max_age: u64) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&cache_control_public(max_age)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&expires_header(max_age)) {
        headers.insert(header::EXPIRES, value);
    }
}

/// Response cache middleware for public GET routes
///
/// Successful JSON responses are stored under `response:<uri>` for
/// `response_ttl`; a hit replays the body with `X-Cache: HIT`.
pub async fn response_cache(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.to_string())
        .unwrap_or_else(|| request.uri().to_string());
    let key = format!("{}{}", RESPONSE_PREFIX, uri);
    let max_age = state.response_ttl.as_secs();

    match state.cache.get::<CachedBody>(&key).await {
        Ok(Some(cached)) => {
            let mut response = Response::new(Body::from(cached.body));
            if let Ok(value) = HeaderValue::from_str(&cached.content_type) {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            response.headers_mut().insert("x-cache", HeaderValue::from_static("HIT"));
            add_cache_headers(&mut response, max_age);
            return response;
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Response cache lookup failed for {}: {}", key, e),
    }

    let response = next.run(request).await;
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if response.status() != StatusCode::OK || !content_type.starts_with("application/json") {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => return ApiError::internal_error(e).into_response(),
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        let cached = CachedBody {
            content_type,
            body: text.to_string(),
        };
        if let Err(e) = state.cache.set(&key, &cached, state.response_ttl).await {
            tracing::warn!("Failed to cache response for {}: {}", key, e);
        }
    }

    let mut response = Response::from_parts(parts, Body::from(bytes));
    response.headers_mut().insert("x-cache", HeaderValue::from_static("MISS"));
    add_cache_headers(&mut response, max_age);
    response
}

// ============================================================================
// Tests
// ============================================================================
