use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::distance::Metric;
use crate::error::Result;
use crate::hsl::Rgb;
use crate::utils::decode_vector;

/// 向量字段的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    /// 语义向量
    Clip,
    /// 颜色直方图
    Color,
}

impl EmbeddingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clip => "clip",
            Self::Color => "color",
        }
    }

    /// 字段声明的距离度量
    pub fn metric(&self) -> Metric {
        match self {
            Self::Clip => Metric::Cosine,
            Self::Color => Metric::Intersection,
        }
    }
}

impl fmt::Display for EmbeddingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `image_vectors` 表中的一行
#[derive(Debug, FromRow)]
pub struct ImageVectorRow {
    pub image_id: String,
    pub filename: String,
    pub folder: String,
    /// 小端序 f32 数组
    pub clip_embedding: Option<Vec<u8>>,
    pub color_histogram: Option<Vec<u8>>,
    /// JSON 数组
    pub dominant_colors: String,
    pub average_color: Option<String>,
}

/// 查询时只读取 ID 和一个向量字段
#[derive(Debug, FromRow)]
pub struct VectorRow {
    pub image_id: String,
    pub filename: String,
    pub vector: Vec<u8>,
}

/// 批量读取元数据时使用，不包含向量本身
#[derive(Debug, FromRow)]
pub struct MetadataRow {
    pub image_id: String,
    pub has_clip: bool,
    pub has_color: bool,
    pub dominant_colors: String,
    pub average_color: Option<String>,
}

/// 一张图片的向量记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageVectorRecord {
    pub image_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub folder: String,
    /// 语义向量，维度与索引一致
    #[serde(default)]
    pub clip_embedding: Option<Vec<f32>>,
    /// 64 维颜色直方图
    #[serde(default)]
    pub color_histogram: Option<Vec<f32>>,
    /// 主色调，按像素数量降序
    #[serde(default)]
    pub dominant_colors: Vec<String>,
    /// `#rrggbb` 格式的平均色
    #[serde(default)]
    pub average_color: Option<String>,
}

impl ImageVectorRecord {
    pub fn new(image_id: impl Into<String>) -> Self {
        Self { image_id: image_id.into(), ..Default::default() }
    }

    /// 平均色的 RGB 形式，格式错误时返回 None
    pub fn average_rgb(&self) -> Option<Rgb> {
        self.average_color.as_deref().and_then(|s| s.parse().ok())
    }
}

impl TryFrom<ImageVectorRow> for ImageVectorRecord {
    type Error = crate::error::SearchError;

    fn try_from(row: ImageVectorRow) -> Result<Self> {
        Ok(Self {
            image_id: row.image_id,
            filename: row.filename,
            folder: row.folder,
            clip_embedding: row.clip_embedding.as_deref().map(decode_vector).transpose()?,
            color_histogram: row.color_histogram.as_deref().map(decode_vector).transpose()?,
            dominant_colors: parse_colors(&row.dominant_colors),
            average_color: row.average_color,
        })
    }
}

/// 用于图库列表展示的颜色元数据
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColorMetadata {
    pub dominant_colors: Vec<String>,
    pub average_color: Option<String>,
    #[schema(value_type = Option<Vec<u8>>)]
    pub average_rgb: Option<[u8; 3]>,
    pub has_clip_embedding: bool,
    pub has_color_embedding: bool,
}

impl From<MetadataRow> for ColorMetadata {
    fn from(row: MetadataRow) -> Self {
        let average_rgb = row.average_color.as_deref().and_then(|s| s.parse::<Rgb>().ok()).map(|c| c.0);
        Self {
            dominant_colors: parse_colors(&row.dominant_colors),
            average_color: row.average_color,
            average_rgb,
            has_clip_embedding: row.has_clip,
            has_color_embedding: row.has_color,
        }
    }
}

/// 索引统计信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub total_images: u64,
    pub with_clip: u64,
    pub with_color: u64,
    pub clip_dimension: usize,
}

/// 单条搜索结果，score 为距离，越小越相似
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub image_id: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

fn parse_colors(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encode_vector;

    #[test]
    fn test_row_to_record() {
        let row = ImageVectorRow {
            image_id: "a.jpg".to_string(),
            filename: "a.jpg".to_string(),
            folder: String::new(),
            clip_embedding: Some(encode_vector(&[0.5, 1.])),
            color_histogram: None,
            dominant_colors: r##"["#ff0000","#00ff00"]"##.to_string(),
            average_color: Some("#800000".to_string()),
        };
        let record = ImageVectorRecord::try_from(row).unwrap();
        assert_eq!(record.clip_embedding, Some(vec![0.5, 1.]));
        assert_eq!(record.color_histogram, None);
        assert_eq!(record.dominant_colors, vec!["#ff0000", "#00ff00"]);
        assert_eq!(record.average_rgb(), Some(Rgb::new(128, 0, 0)));
    }

    #[test]
    fn test_record_json() {
        let record: ImageVectorRecord =
            serde_json::from_str(r#"{"imageId": "b.png", "clipEmbedding": [1.0]}"#).unwrap();
        assert_eq!(record.image_id, "b.png");
        assert_eq!(record.clip_embedding, Some(vec![1.]));
        assert!(record.dominant_colors.is_empty());
    }
}
