use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::search::Domain;

/// 健康检查响应
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// 向量存储是否可用
    pub available: bool,
}

/// 批量读取元数据的请求
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub image_ids: Vec<String>,
}

/// 删除向量记录的响应
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// 相似搜索请求
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarRequest {
    pub image_id: String,
    #[serde(default = "default_domain")]
    pub domain: Domain,
    /// 返回的结果数量，范围 1 到 20
    pub limit: Option<usize>,
    /// 额外返回的“陌生图片”数量
    pub strangers: Option<usize>,
}

/// 反向搜索请求
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AntipodeRequest {
    pub image_id: String,
    pub domain: Domain,
    /// 搜索域支持的方法名，例如 negate、complementary
    pub method: String,
    pub limit: Option<usize>,
}

/// 文本搜索请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct TextSearchRequest {
    pub text: String,
    pub limit: Option<usize>,
}

/// 颜色搜索请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct ColorSearchRequest {
    /// `#rrggbb` 格式的颜色
    pub color: String,
    pub limit: Option<usize>,
}

/// 雷达反向查询请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct RadarQueryRequest {
    /// 雷达上的点，每条概念轴一个分量，范围 [-1, 1]
    pub point: Vec<f32>,
    pub limit: Option<usize>,
}

fn default_domain() -> Domain {
    Domain::Clip
}
