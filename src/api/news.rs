//! News API endpoints
//!
//! Each news kind is mounted under its own prefix (`/api/main-news`,
//! `/api/news`, `/api/subnews`, `/api/mini-news`, `/api/trending-news`)
//! with the same route shape. The kind travels to the handlers as a
//! request extension. `/api/combined-news` pages across every kind.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{require_admin, require_auth, response_cache, ApiError, AppState};
use crate::api::responses::ApiResponse;
use crate::models::{CombinedNewsPage, CreateNewsInput, News, NewsKind, StoredImage, UpdateNewsInput};

type NewsList = Json<ApiResponse<Vec<News>>>;

/// Routes for one news kind
pub fn router(state: AppState, kind: NewsKind) -> Router<AppState> {
    let mut public = Router::new()
        .route("/public", get(list_active))
        .route("/slug/{slug}", get(get_by_slug));
    if kind.supports_category_listing() {
        public = public.route("/category/{category}", get(list_by_category));
    }
    let public = public.route_layer(middleware::from_fn_with_state(state.clone(), response_cache));

    let mut images = Router::new().route("/{id}/thumb", get(get_thumb));
    if kind.has_gallery() {
        images = images.route("/{id}/image/{index}", get(get_image));
    }

    let admin = Router::new()
        .route("/", post(create_news))
        .route("/deleted", get(list_deleted))
        .route("/{id}", axum::routing::put(update_news).delete(soft_delete_news))
        .route("/{id}/hard", delete(hard_delete_news))
        .route_layer(middleware::from_fn(require_admin));

    let protected = Router::new()
        .route("/", get(list_active))
        .route("/{id}", get(get_news))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(images).merge(protected).layer(Extension(kind))
}

/// Routes under `/api/combined-news`
pub fn combined_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(combined_news))
        .route_layer(middleware::from_fn_with_state(state, response_cache))
}

async fn list_active(State(state): State<AppState>, Extension(kind): Extension<NewsKind>) -> Result<NewsList, ApiError> {
    Ok(Json(ApiResponse::list(state.news_service.list_active(kind).await?)))
}

async fn list_deleted(State(state): State<AppState>, Extension(kind): Extension<NewsKind>) -> Result<NewsList, ApiError> {
    Ok(Json(ApiResponse::list(state.news_service.list_deleted(kind).await?)))
}

async fn list_by_category(
    State(state): State<AppState>,
    Extension(kind): Extension<NewsKind>,
    Path(category): Path<String>,
) -> Result<NewsList, ApiError> {
    Ok(Json(ApiResponse::list(
        state.news_service.list_by_category(kind, &category).await?,
    )))
}

async fn get_by_slug(
    State(state): State<AppState>,
    Extension(kind): Extension<NewsKind>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<News>>, ApiError> {
    Ok(Json(ApiResponse::data(
        state.news_service.get_active_by_slug(kind, &slug).await?,
    )))
}

async fn get_news(
    State(state): State<AppState>,
    Extension(kind): Extension<NewsKind>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<News>>, ApiError> {
    Ok(Json(ApiResponse::data(state.news_service.get(kind, id).await?)))
}

/// GET /{id}/thumb
async fn get_thumb(
    State(state): State<AppState>,
    Extension(kind): Extension<NewsKind>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    Ok(image_response(state.news_service.thumb(kind, id).await?))
}

/// GET /{id}/image/{index}, zero-based
async fn get_image(
    State(state): State<AppState>,
    Extension(kind): Extension<NewsKind>,
    Path((id, index)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    Ok(image_response(state.news_service.image(kind, id, index).await?))
}

fn image_response(image: StoredImage) -> Response {
    let headers = [
        (header::CONTENT_TYPE, image.mime_type.clone()),
        (header::CONTENT_LENGTH, image.size().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", image.original_name.replace('"', "")),
        ),
    ];
    (headers, image.data).into_response()
}

async fn create_news(
    State(state): State<AppState>,
    Extension(kind): Extension<NewsKind>,
    Json(body): Json<CreateNewsInput>,
) -> Result<(StatusCode, Json<ApiResponse<News>>), ApiError> {
    let news = state.news_service.create(kind, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(news).with_message(format!("{} created successfully", kind.label()))),
    ))
}

async fn update_news(
    State(state): State<AppState>,
    Extension(kind): Extension<NewsKind>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateNewsInput>,
) -> Result<Json<ApiResponse<News>>, ApiError> {
    let news = state.news_service.update(kind, id, body).await?;
    Ok(Json(
        ApiResponse::data(news).with_message(format!("{} updated successfully", kind.label())),
    ))
}

async fn soft_delete_news(
    State(state): State<AppState>,
    Extension(kind): Extension<NewsKind>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.news_service.soft_delete(kind, id).await?;
    Ok(Json(ApiResponse::message(format!("{} deleted successfully", kind.label()))))
}

async fn hard_delete_news(
    State(state): State<AppState>,
    Extension(kind): Extension<NewsKind>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.news_service.hard_delete(kind, id).await?;
    Ok(Json(ApiResponse::message(format!(
        "{} permanently deleted successfully",
        kind.label()
    ))))
}

/// GET /api/combined-news?page=&limit=
async fn combined_news(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CombinedNewsPage>, ApiError> {
    Ok(Json(state.news_service.combined(query.page, query.limit).await?))
}
