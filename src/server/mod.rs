mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health_handler,
        api::stats_handler,
        api::store_vectors_handler,
        api::get_vectors_handler,
        api::delete_vectors_handler,
        api::metadata_handler,
        api::similar_handler,
        api::antipode_handler,
        api::text_search_handler,
        api::color_search_handler,
        api::radar_handler,
        api::radar_query_handler,
        api::metrics_handler,
    ),
    components(schemas(
        types::HealthResponse,
        types::MetadataRequest,
        types::DeleteResponse,
        types::SimilarRequest,
        types::AntipodeRequest,
        types::TextSearchRequest,
        types::ColorSearchRequest,
        types::RadarQueryRequest,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/stats", get(api::stats_handler))
        .route("/metrics", get(api::metrics_handler))
        .route("/vectors", post(api::store_vectors_handler))
        // 图片 ID 是相对路径，可能包含 `/`
        .route(
            "/vectors/{*image_id}",
            get(api::get_vectors_handler).delete(api::delete_vectors_handler),
        )
        .route("/metadata", post(api::metadata_handler))
        .route("/search/similar", post(api::similar_handler))
        .route("/search/antipode", post(api::antipode_handler))
        .route("/search/text", post(api::text_search_handler))
        .route("/search/color", post(api::color_search_handler))
        // 图片 ID 可能是 query，不能放在 /radar/ 下
        .route("/radar-query", post(api::radar_query_handler))
        .route("/radar/{*image_id}", get(api::radar_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 上传限制：10M
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 10))
        .with_state(state)
}
