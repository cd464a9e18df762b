use std::time::Instant;

use log::debug;
use serde::Serialize;
use utoipa::ToSchema;

use super::{AntipodeMethod, Domain, VectorSearch, measured};
use crate::catalog::{ImageCatalog, is_excluded};
use crate::db::{EmbeddingKind, ImageVectorRecord, SearchResult};
use crate::embed::EmbeddingProvider;
use crate::error::{Result, SearchError};
use crate::hsl::Rgb;
use crate::radar::{AxisScore, CONCEPT_AXES, amplify, axis_score, point_to_query, prompt};
use crate::utils::{MAX_LIMIT, check_limit};

/// 相似搜索的结果
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarResponse {
    pub source_id: String,
    pub domain: Domain,
    /// 最相似的图片，距离升序
    pub results: Vec<SearchResult>,
    /// 最不相似的图片，距离降序，用于对比展示
    pub strangers: Vec<SearchResult>,
}

/// 反向搜索的结果
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AntipodeResponse {
    pub source_id: String,
    pub domain: Domain,
    pub method: AntipodeMethod,
    pub label: String,
    pub description: String,
    pub results: Vec<SearchResult>,
}

/// 雷达反向查询中的一条轴
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QueryAxis {
    pub label: String,
    /// 去掉显示放大后的原始得分
    pub score: f32,
}

/// 雷达反向查询的结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RadarQueryResponse {
    /// 合成的文本查询
    pub query: String,
    pub axes: Vec<QueryAxis>,
    pub results: Vec<SearchResult>,
}

fn clip_embedding(record: &ImageVectorRecord) -> Result<&[f32]> {
    record.clip_embedding.as_deref().ok_or_else(|| SearchError::MissingEmbedding {
        image_id: record.image_id.clone(),
        kind: EmbeddingKind::Clip,
    })
}

fn color_histogram(record: &ImageVectorRecord) -> Result<&[f32]> {
    record.color_histogram.as_deref().ok_or_else(|| SearchError::MissingEmbedding {
        image_id: record.image_id.clone(),
        kind: EmbeddingKind::Color,
    })
}

fn average_rgb(record: &ImageVectorRecord) -> Result<Rgb> {
    record.average_rgb().ok_or_else(|| SearchError::MissingEmbedding {
        image_id: record.image_id.clone(),
        kind: EmbeddingKind::Color,
    })
}

impl<E: EmbeddingProvider, C: ImageCatalog> VectorSearch<E, C> {
    /// 读取源图片的记录
    async fn source(&self, image_id: &str) -> Result<ImageVectorRecord> {
        self.store
            .get(image_id)
            .await?
            .ok_or_else(|| SearchError::NotFound(format!("图片 {image_id} 没有向量记录")))
    }

    /// 去掉带有排除标签的图片
    pub async fn filter_excluded(&self, domain: Domain, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(results);
        }
        let ids = results.iter().map(|r| r.image_id.clone()).collect::<Vec<_>>();
        let tags = self.catalog.tags(&ids).await?;
        let before = results.len();
        let results = results
            .into_iter()
            .filter(|r| !tags.get(&r.image_id).is_some_and(|t| is_excluded(domain, t)))
            .collect::<Vec<_>>();
        if results.len() != before {
            debug!("排除标签过滤掉 {} 个结果", before - results.len());
        }
        Ok(results)
    }

    /// 相似搜索，可以同时返回少量最不相似的图片
    pub async fn similar(
        &self,
        image_id: &str,
        domain: Domain,
        limit: usize,
        strangers: usize,
    ) -> Result<SimilarResponse> {
        let limit = check_limit(limit)?;
        if strangers > MAX_LIMIT {
            return Err(SearchError::InvalidArgument(format!("strangers 不能超过 {MAX_LIMIT}")));
        }

        let (results, strangers) = measured(domain, "similar", async {
            let record = self.source(image_id).await?;
            let kind = domain.kind();
            let vector = match kind {
                EmbeddingKind::Clip => clip_embedding(&record)?,
                EmbeddingKind::Color => color_histogram(&record)?,
            };
            let results = self.store.query(kind, vector, limit, Some(image_id)).await?;
            let strangers = if strangers > 0 {
                self.store.query_farthest(kind, vector, strangers, Some(image_id)).await?
            } else {
                vec![]
            };
            Ok((results, strangers))
        })
        .await?;

        Ok(SimilarResponse {
            source_id: image_id.to_string(),
            domain,
            results: self.filter_excluded(domain, results).await?,
            strangers: self.filter_excluded(domain, strangers).await?,
        })
    }

    /// 反向搜索，`method` 必须是 `domain` 支持的方法
    pub async fn antipode(
        &self,
        image_id: &str,
        domain: Domain,
        method: &str,
        limit: usize,
    ) -> Result<AntipodeResponse> {
        let method = AntipodeMethod::parse(domain, method)?;
        let limit = check_limit(limit)?;
        self.store.ready().await?;

        let record = self.source(image_id).await?;
        let exclude = Some(image_id);
        let results = match method {
            AntipodeMethod::Negate => {
                self.search_clip_negated(clip_embedding(&record)?, limit, exclude).await?
            }
            AntipodeMethod::Stranger => {
                self.search_clip_very_stranger(clip_embedding(&record)?, limit, exclude).await?
            }
            AntipodeMethod::Otherwise => self.search_clip_otherwise(limit, exclude).await?,
            AntipodeMethod::Reflectroid => {
                self.search_clip_centroid_reflection(clip_embedding(&record)?, limit, exclude).await?
            }
            AntipodeMethod::Complementary => {
                self.search_color_complementary(average_rgb(&record)?, limit, exclude).await?
            }
            AntipodeMethod::Histogram => {
                self.search_color_histogram_inverted(color_histogram(&record)?, limit, exclude).await?
            }
            AntipodeMethod::Lightness => {
                self.search_color_lightness_inverted(average_rgb(&record)?, limit, exclude).await?
            }
            AntipodeMethod::Negative => {
                self.search_color_negative_space(color_histogram(&record)?, limit, exclude).await?
            }
        };

        Ok(AntipodeResponse {
            source_id: image_id.to_string(),
            domain,
            method,
            label: method.label().to_string(),
            description: method.description().to_string(),
            results: self.filter_excluded(domain, results).await?,
        })
    }

    /// 文本搜索，结果经过排除标签过滤
    pub async fn text_search(&self, text: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let results = self.search_by_text(text, limit).await?;
        self.filter_excluded(Domain::Clip, results).await
    }

    /// 颜色搜索，结果经过排除标签过滤
    pub async fn color_search(&self, hex: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let results = self.search_by_hex_color(hex, limit).await?;
        self.filter_excluded(Domain::Color, results).await
    }

    /// 计算图片在每条概念轴上的得分
    pub async fn concept_radar(&self, image_id: &str) -> Result<Vec<AxisScore>> {
        let start = Instant::now();
        self.store.ready().await?;
        let record = self.source(image_id).await?;
        let image = clip_embedding(&record)?;

        let mut scores = Vec::with_capacity(CONCEPT_AXES.len());
        for axis in CONCEPT_AXES {
            let negative = self.concept(&prompt(axis.negative)).await?;
            let positive = self.concept(&prompt(axis.positive)).await?;
            let score = axis_score(image, &negative, &positive);
            scores.push(AxisScore {
                negative: axis.negative,
                positive: axis.positive,
                score,
                display: amplify(score),
            });
        }
        debug!("概念雷达 {image_id} 耗时 {:.2}ms", start.elapsed().as_secs_f64() * 1000.);
        Ok(scores)
    }

    /// 将雷达上的点转换为文本查询并搜索
    pub async fn radar_query(&self, point: &[f32], limit: usize) -> Result<RadarQueryResponse> {
        let limit = check_limit(limit)?;
        let query = point_to_query(point)?;
        debug!("雷达查询: {}", query.text);
        let results = self.text_search(&query.text, limit).await?;
        Ok(RadarQueryResponse {
            axes: query.axes.into_iter().map(|(label, score)| QueryAxis { label, score }).collect(),
            query: query.text,
            results,
        })
    }
}
