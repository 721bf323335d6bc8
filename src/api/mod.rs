//! API layer - HTTP handlers and routing
//!
//! Everything is served under `/api`:
//! - `/api/auth` - registration, login, sessions
//! - `/api/users` - accounts and shipping details
//! - `/api/products`, `/api/cart`, `/api/wishlist`, `/api/reviews`
//! - `/api/categories`, `/api/subcategories`, `/api/minicategories`, `/api/tabs`
//! - `/api/banners`, `/api/hero-sliders`
//! - one prefix per news kind plus `/api/combined-news`
//! - `/api/public/...` - cached storefront reads
//! - `/api/health`

pub mod auth;
pub mod banners;
pub mod cart;
pub mod categories;
pub mod common;
pub mod hero_sliders;
pub mod middleware;
pub mod mini_categories;
pub mod news;
pub mod products;
pub mod responses;
pub mod reviews;
pub mod sub_categories;
pub mod tabs;
pub mod users;
pub mod wishlist;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::Cache;
use crate::config::{Config, ServerConfig};
use crate::db::repositories::{
    SqlxBannerRepository, SqlxCartRepository, SqlxCategoryRepository, SqlxCounterRepository,
    SqlxHeroSliderRepository, SqlxMiniCategoryRepository, SqlxNewsRepository, SqlxProductRepository,
    SqlxReviewRepository, SqlxSessionRepository, SqlxSubCategoryRepository, SqlxTabRepository, SqlxUserRepository,
    SqlxWishlistRepository,
};
use crate::db::DynDatabasePool;
use crate::models::NewsKind;
use crate::services::{
    BannerService, CartService, CategoryService, HeroSliderService, MiniCategoryService, NewsService,
    ProductService, ReviewService, SubCategoryService, TabService, UserService, WishlistService,
};

pub use middleware::{ApiError, AppState, RequestStats};

/// Wire repositories and services into the shared handler state
pub fn build_state(pool: DynDatabasePool, cache: Arc<Cache>, config: &Config) -> AppState {
    let products = SqlxProductRepository::boxed(pool.clone());
    let categories = SqlxCategoryRepository::boxed(pool.clone());
    let sub_categories = SqlxSubCategoryRepository::boxed(pool.clone());

    AppState {
        response_ttl: Duration::from_secs(config.cache.response_ttl_seconds),
        session_days: config.auth.session_days,
        user_service: Arc::new(UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.auth.session_days,
        )),
        product_service: Arc::new(ProductService::new(products.clone(), cache.clone())),
        cart_service: Arc::new(CartService::new(
            SqlxCartRepository::boxed(pool.clone()),
            products.clone(),
        )),
        wishlist_service: Arc::new(WishlistService::new(
            SqlxWishlistRepository::boxed(pool.clone()),
            products.clone(),
        )),
        review_service: Arc::new(ReviewService::new(
            SqlxReviewRepository::boxed(pool.clone()),
            products,
            cache.clone(),
        )),
        category_service: Arc::new(CategoryService::with_cache_ttl(
            categories.clone(),
            cache.clone(),
            Duration::from_secs(config.cache.ttl_seconds),
        )),
        sub_category_service: Arc::new(SubCategoryService::new(
            sub_categories.clone(),
            categories.clone(),
            cache.clone(),
        )),
        mini_category_service: Arc::new(MiniCategoryService::new(
            SqlxMiniCategoryRepository::boxed(pool.clone()),
            categories,
            sub_categories,
            cache.clone(),
        )),
        tab_service: Arc::new(TabService::new(SqlxTabRepository::boxed(pool.clone()), cache.clone())),
        banner_service: Arc::new(BannerService::new(
            SqlxBannerRepository::boxed(pool.clone()),
            SqlxCounterRepository::boxed(pool.clone()),
            cache.clone(),
        )),
        hero_slider_service: Arc::new(HeroSliderService::new(
            SqlxHeroSliderRepository::boxed(pool.clone()),
            cache.clone(),
        )),
        news_service: Arc::new(NewsService::new(SqlxNewsRepository::boxed(pool), cache.clone())),
        request_stats: Arc::new(RequestStats::new()),
        cache,
    }
}

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .nest("/products", products::public_router(state.clone()))
        .nest("/categories", categories::public_router(state.clone()))
        .nest("/subcategories", sub_categories::public_router(state.clone()))
        .nest("/minicategories", mini_categories::public_router(state.clone()))
        .nest("/tabs", tabs::public_router(state.clone()))
        .nest("/banners", banners::public_router(state.clone()))
        .nest("/hero-sliders", hero_sliders::public_router(state.clone()));

    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/users", users::router(state.clone()))
        .nest("/products", products::router(state.clone()))
        .nest("/cart", cart::router(state.clone()))
        .nest("/wishlist", wishlist::router(state.clone()))
        .nest("/reviews", reviews::router(state.clone()))
        .nest("/categories", categories::router(state.clone()))
        .nest("/subcategories", sub_categories::router(state.clone()))
        .nest("/minicategories", mini_categories::router(state.clone()))
        .nest("/tabs", tabs::router(state.clone()))
        .nest("/banners", banners::router(state.clone()))
        .nest("/hero-sliders", hero_sliders::router(state.clone()))
        .nest("/combined-news", news::combined_router(state.clone()))
        .nest("/public", public);

    for kind in NewsKind::ALL {
        router = router.nest(&format!("/{}", kind.route_prefix()), news::router(state.clone(), kind));
    }

    router
}

/// Build the complete router with middleware
///
/// # Errors
/// The configured CORS origin is not a valid header value.
pub fn build_router(state: AppState, server: &ServerConfig) -> anyhow::Result<Router> {
    // Cookie sessions need credentials, so the origin must be explicit
    let origin = server
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", server.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api", build_api_router(state.clone()))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(server.body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Request stats (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since startup
    pub uptime: u64,
    pub requests: u64,
    #[serde(rename = "avgResponseTimeUs")]
    pub avg_response_time_us: f64,
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.request_stats.uptime_seconds(),
        requests: state.request_stats.total_requests(),
        avg_response_time_us: state.request_stats.avg_response_time_us(),
    })
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
