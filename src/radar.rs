//! 概念雷达：把图片的语义向量投影到一组固定的两极概念轴上

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use log::debug;
use serde::Serialize;
use utoipa::ToSchema;

use crate::distance::cosine_similarity;
use crate::error::{Result, SearchError};

/// 一条两极概念轴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptAxis {
    pub negative: &'static str,
    pub positive: &'static str,
}

/// 固定顺序的 10 条概念轴
pub const CONCEPT_AXES: [ConceptAxis; 10] = [
    ConceptAxis { negative: "artificial", positive: "organic" },
    ConceptAxis { negative: "dark", positive: "bright" },
    ConceptAxis { negative: "calm", positive: "energetic" },
    ConceptAxis { negative: "simple", positive: "complex" },
    ConceptAxis { negative: "cold", positive: "warm" },
    ConceptAxis { negative: "vintage", positive: "modern" },
    ConceptAxis { negative: "urban", positive: "natural" },
    ConceptAxis { negative: "melancholic", positive: "joyful" },
    ConceptAxis { negative: "soft", positive: "sharp" },
    ConceptAxis { negative: "empty", positive: "crowded" },
];

/// 显示时的放大指数，`display = sign(s) * |s|^0.5`
const DISPLAY_EXPONENT: f32 = 0.5;
/// 反向映射时保留的最多轴数
const MAX_QUERY_AXES: usize = 3;
/// 低于该强度的轴不参与反向映射
const MIN_INTENSITY: f32 = 0.04;
const VERY_INTENSITY: f32 = 0.36;
const SLIGHT_INTENSITY: f32 = 0.09;

/// 概念标签对应的文本提示词
pub fn prompt(label: &str) -> String {
    format!("a {label} image")
}

/// 单条轴的得分
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AxisScore {
    pub negative: &'static str,
    pub positive: &'static str,
    /// 原始得分，范围 [-1, 1]，正数偏向 positive
    pub score: f32,
    /// 放大后用于显示的得分
    pub display: f32,
}

/// 根据图片与两极文本的余弦相似度计算得分
pub fn axis_score(image: &[f32], negative: &[f32], positive: &[f32]) -> f32 {
    let neg = cosine_similarity(image, negative);
    let pos = cosine_similarity(image, positive);
    let denom = pos.abs().max(neg.abs());
    if denom == 0. {
        return 0.;
    }
    ((pos - neg) / denom).clamp(-1., 1.)
}

/// 原始得分 -> 显示得分
pub fn amplify(score: f32) -> f32 {
    score.signum() * score.abs().powf(DISPLAY_EXPONENT)
}

/// 显示得分 -> 原始得分
pub fn deamplify(display: f32) -> f32 {
    let d = display.clamp(-1., 1.);
    d.signum() * d.abs().powf(1. / DISPLAY_EXPONENT)
}

/// 由雷达上的一个点合成的文本查询
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarQueryText {
    pub text: String,
    /// 参与合成的 `(标签, 原始得分)`，按强度降序
    pub axes: Vec<(String, f32)>,
}

/// 将雷达上的点反向映射为文本查询
///
/// 每个分量先去掉显示放大得到原始得分，按绝对值排序后保留最强的几条轴，
/// 根据强度加上 very / slightly 修饰词。
pub fn point_to_query(point: &[f32]) -> Result<RadarQueryText> {
    if point.len() != CONCEPT_AXES.len() {
        return Err(SearchError::InvalidArgument(format!(
            "雷达坐标需要 {} 个分量，实际 {}",
            CONCEPT_AXES.len(),
            point.len()
        )));
    }
    if point.iter().any(|v| !v.is_finite()) {
        return Err(SearchError::InvalidArgument("雷达坐标包含非法值".to_string()));
    }

    let mut ranked = point
        .iter()
        .zip(CONCEPT_AXES.iter())
        .map(|(&d, axis)| (axis, deamplify(d)))
        .filter(|(_, raw)| raw.abs() >= MIN_INTENSITY)
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
    ranked.truncate(MAX_QUERY_AXES);

    if ranked.is_empty() {
        return Err(SearchError::InvalidArgument("雷达坐标太接近中心，无法生成查询".to_string()));
    }

    let mut parts = vec![];
    let mut axes = vec![];
    for (axis, raw) in ranked {
        let label = if raw > 0. { axis.positive } else { axis.negative };
        let intensity = raw.abs();
        let part = if intensity >= VERY_INTENSITY {
            format!("very {label}")
        } else if intensity < SLIGHT_INTENSITY {
            format!("slightly {label}")
        } else {
            label.to_string()
        };
        parts.push(part);
        axes.push((label.to_string(), raw));
    }

    Ok(RadarQueryText { text: format!("a {} image", parts.join(", ")), axes })
}

/// 文本向量缓存，按提示词原文索引，进程内永不过期
///
/// 并发读取安全；同一个提示词可能被并发重复计算，但结果只会写入一次。
#[derive(Debug, Default)]
pub struct ConceptCache {
    entries: RwLock<HashMap<String, Arc<Vec<f32>>>>,
}

impl ConceptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用预先计算好的向量创建缓存
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Vec<f32>)>) -> Self {
        let entries = entries.into_iter().map(|(k, v)| (k, Arc::new(v))).collect();
        Self { entries: RwLock::new(entries) }
    }

    pub fn get(&self, prompt: &str) -> Option<Arc<Vec<f32>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).get(prompt).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 读取缓存，不存在时调用 compute 计算并写入
    ///
    /// compute 返回 `Ok(None)` 表示上游没有产生向量，此时不会写入缓存。
    pub async fn get_or_compute<F, Fut>(&self, prompt: &str, compute: F) -> Result<Arc<Vec<f32>>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<Vec<f32>>>>,
    {
        if let Some(v) = self.get(prompt) {
            return Ok(v);
        }

        debug!("计算概念文本向量: {prompt}");
        let Some(vector) = compute(prompt.to_string()).await? else {
            return Err(SearchError::UpstreamFailure(format!("没有为 \"{prompt}\" 生成文本向量")));
        };

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // 并发计算时保留先写入的结果
        let entry = entries.entry(prompt.to_string()).or_insert_with(|| Arc::new(vector));
        Ok(entry.clone())
    }
}
