use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum_auth::AuthBearer;
use log::info;
use prometheus::TextEncoder;

use super::error::{AppError, Result, Unauthorized};
use super::state::AppState;
use super::types::*;
use crate::db::{ColorMetadata, ImageVectorRecord, IndexStats, SearchResult};
use crate::radar::AxisScore;
use crate::search::{AntipodeResponse, RadarQueryResponse, SimilarResponse};

/// 检查 token 是否正确
fn check_token(state: &AppState, token: &str) -> Result<()> {
    if token != state.token {
        return Err(Unauthorized.into());
    }
    Ok(())
}

/// 检查向量存储是否可用
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse { available: state.db.is_vector_search_available().await })
}

/// 获取索引统计信息
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, body = IndexStats),
        (status = 503, description = "向量存储不可用"),
    )
)]
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Result<Json<IndexStats>> {
    Ok(Json(state.db.get_index_stats().await?))
}

/// 写入一条向量记录，已有记录会被整体替换
#[utoipa::path(
    post,
    path = "/vectors",
    request_body = ImageVectorRecord,
)]
pub async fn store_vectors_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    Json(record): Json<ImageVectorRecord>,
) -> Result<StatusCode> {
    check_token(&state, &token)?;
    state.db.store_image_vectors(&record).await?;
    info!("写入向量记录: {}", record.image_id);
    Ok(StatusCode::NO_CONTENT)
}

/// 读取一条向量记录
#[utoipa::path(
    get,
    path = "/vectors/{image_id}",
    params(("image_id" = String, Path, description = "图片 ID")),
    responses(
        (status = 200, body = ImageVectorRecord),
        (status = 404, description = "记录不存在"),
    )
)]
pub async fn get_vectors_handler(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> Result<Json<ImageVectorRecord>> {
    let record = state.db.get_image_vectors(&image_id).await?;
    match record {
        Some(record) => Ok(Json(record)),
        None => Err(AppError::from(crate::error::SearchError::NotFound(format!("图片 {image_id}")))),
    }
}

/// 删除一条向量记录
#[utoipa::path(
    delete,
    path = "/vectors/{image_id}",
    params(("image_id" = String, Path, description = "图片 ID")),
    responses(
        (status = 200, body = DeleteResponse),
    ),
)]
pub async fn delete_vectors_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    Path(image_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    check_token(&state, &token)?;
    let deleted = state.db.delete_image_vectors(&image_id).await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// 批量读取颜色元数据
#[utoipa::path(
    post,
    path = "/metadata",
    request_body = MetadataRequest,
    responses(
        (status = 200, body = HashMap<String, ColorMetadata>),
    )
)]
pub async fn metadata_handler(
    State(state): State<Arc<AppState>>,
    Json(data): Json<MetadataRequest>,
) -> Result<Json<HashMap<String, ColorMetadata>>> {
    Ok(Json(state.db.batch_get_color_metadata(&data.image_ids).await?))
}

/// 相似搜索
#[utoipa::path(
    post,
    path = "/search/similar",
    request_body = SimilarRequest,
    responses(
        (status = 200, body = SimilarResponse),
    )
)]
pub async fn similar_handler(
    State(state): State<Arc<AppState>>,
    Json(data): Json<SimilarRequest>,
) -> Result<Json<SimilarResponse>> {
    let limit = data.limit.unwrap_or(state.count);
    let strangers = data.strangers.unwrap_or(state.strangers);
    Ok(Json(state.db.similar(&data.image_id, data.domain, limit, strangers).await?))
}

/// 反向搜索
#[utoipa::path(
    post,
    path = "/search/antipode",
    request_body = AntipodeRequest,
    responses(
        (status = 200, body = AntipodeResponse),
        (status = 400, description = "搜索域不支持该方法"),
        (status = 404, description = "图片没有所需的向量"),
    )
)]
pub async fn antipode_handler(
    State(state): State<Arc<AppState>>,
    Json(data): Json<AntipodeRequest>,
) -> Result<Json<AntipodeResponse>> {
    let limit = data.limit.unwrap_or(state.count);
    Ok(Json(state.db.antipode(&data.image_id, data.domain, &data.method, limit).await?))
}

/// 文本搜索
#[utoipa::path(
    post,
    path = "/search/text",
    request_body = TextSearchRequest,
    responses(
        (status = 200, body = Vec<SearchResult>),
    )
)]
pub async fn text_search_handler(
    State(state): State<Arc<AppState>>,
    Json(data): Json<TextSearchRequest>,
) -> Result<Json<Vec<SearchResult>>> {
    let limit = data.limit.unwrap_or(state.count);
    Ok(Json(state.db.text_search(&data.text, limit).await?))
}

/// 颜色搜索
#[utoipa::path(
    post,
    path = "/search/color",
    request_body = ColorSearchRequest,
    responses(
        (status = 200, body = Vec<SearchResult>),
    )
)]
pub async fn color_search_handler(
    State(state): State<Arc<AppState>>,
    Json(data): Json<ColorSearchRequest>,
) -> Result<Json<Vec<SearchResult>>> {
    let limit = data.limit.unwrap_or(state.count);
    Ok(Json(state.db.color_search(&data.color, limit).await?))
}

/// 获取图片的概念雷达
#[utoipa::path(
    get,
    path = "/radar/{image_id}",
    params(("image_id" = String, Path, description = "图片 ID")),
    responses(
        (status = 200, body = Vec<AxisScore>),
    )
)]
pub async fn radar_handler(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<String>,
) -> Result<Json<Vec<AxisScore>>> {
    Ok(Json(state.db.concept_radar(&image_id).await?))
}

/// 由雷达上的点生成文本查询并搜索
#[utoipa::path(
    post,
    path = "/radar-query",
    request_body = RadarQueryRequest,
    responses(
        (status = 200, body = RadarQueryResponse),
    )
)]
pub async fn radar_query_handler(
    State(state): State<Arc<AppState>>,
    Json(data): Json<RadarQueryRequest>,
) -> Result<Json<RadarQueryResponse>> {
    let limit = data.limit.unwrap_or(state.count);
    Ok(Json(state.db.radar_query(&data.point, limit).await?))
}

/// 导出 prometheus 指标
#[utoipa::path(get, path = "/metrics")]
pub async fn metrics_handler() -> Result<String> {
    let encoder = TextEncoder::new();
    Ok(encoder.encode_to_string(&prometheus::gather())?)
}
