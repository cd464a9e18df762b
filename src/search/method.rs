use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::EmbeddingKind;
use crate::error::{Result, SearchError};

/// 搜索域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// 语义
    Clip,
    /// 颜色
    Color,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clip => "clip",
            Self::Color => "color",
        }
    }

    /// 该搜索域查询的向量字段
    pub fn kind(&self) -> EmbeddingKind {
        match self {
            Self::Clip => EmbeddingKind::Clip,
            Self::Color => EmbeddingKind::Color,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "clip" => Ok(Self::Clip),
            "color" => Ok(Self::Color),
            _ => Err(SearchError::InvalidArgument(format!("未知的搜索域 {s}，可选值: clip, color"))),
        }
    }
}

/// 反向搜索方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AntipodeMethod {
    /// 语义向量取反
    Negate,
    /// 最远邻
    Stranger,
    /// 固定的“反义”文本提示词
    Otherwise,
    /// 关于质心做点反射
    Reflectroid,
    /// 平均色的互补色
    Complementary,
    /// 直方图反转
    Histogram,
    /// 亮度反转
    Lightness,
    /// 负空间直方图
    Negative,
}

impl AntipodeMethod {
    pub const CLIP_METHODS: [Self; 4] = [Self::Negate, Self::Stranger, Self::Otherwise, Self::Reflectroid];
    pub const COLOR_METHODS: [Self; 4] = [Self::Complementary, Self::Histogram, Self::Lightness, Self::Negative];

    /// 搜索域支持的方法
    pub fn methods(domain: Domain) -> &'static [Self] {
        match domain {
            Domain::Clip => &Self::CLIP_METHODS,
            Domain::Color => &Self::COLOR_METHODS,
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            Self::Negate | Self::Stranger | Self::Otherwise | Self::Reflectroid => Domain::Clip,
            Self::Complementary | Self::Histogram | Self::Lightness | Self::Negative => Domain::Color,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negate => "negate",
            Self::Stranger => "stranger",
            Self::Otherwise => "otherwise",
            Self::Reflectroid => "reflectroid",
            Self::Complementary => "complementary",
            Self::Histogram => "histogram",
            Self::Lightness => "lightness",
            Self::Negative => "negative",
        }
    }

    /// 解析搜索域下的方法名，不支持时错误信息中列出可选方法
    pub fn parse(domain: Domain, method: &str) -> Result<Self> {
        let methods = Self::methods(domain);
        methods.iter().copied().find(|m| m.as_str() == method).ok_or_else(|| {
            let valid = methods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
            SearchError::InvalidArgument(format!("{domain} 不支持方法 {method}，可选方法: {valid}"))
        })
    }

    /// 用于展示的名称
    pub fn label(&self) -> &'static str {
        match self {
            Self::Negate => "Negated",
            Self::Stranger => "Very Stranger",
            Self::Otherwise => "Otherwise",
            Self::Reflectroid => "Reflectroid",
            Self::Complementary => "Complementary",
            Self::Histogram => "Inverted Histogram",
            Self::Lightness => "Inverted Lightness",
            Self::Negative => "Negative Space",
        }
    }

    /// 用于展示的一句话说明
    pub fn description(&self) -> &'static str {
        match self {
            Self::Negate => "Images closest to the sign-flipped embedding of this image",
            Self::Stranger => "Images farthest away from this image in meaning",
            Self::Otherwise => "Images matching a generic description of the unfamiliar and unexpected",
            Self::Reflectroid => "This image reflected through the center of the whole collection",
            Self::Complementary => "Images dominated by the complementary hue of this image",
            Self::Histogram => "Images made of the colors this image lacks",
            Self::Lightness => "Images with the lightness and saturation of this image inverted",
            Self::Negative => "Images filling the color space this image leaves empty",
        }
    }
}

impl fmt::Display for AntipodeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
