use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::task::spawn_blocking;
use utoipa::ToSchema;

use super::VectorSearch;
use crate::catalog::{CatalogImage, ImageCatalog};
use crate::color;
use crate::db::{EmbeddingKind, ImageVectorRecord};
use crate::embed::EmbeddingProvider;
use crate::error::{Result, SearchError, check_dimension};
use crate::metrics;

/// 批量生成向量的参数
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// 需要生成的向量类型
    pub kinds: Vec<EmbeddingKind>,
    /// 已有向量的图片也重新生成
    pub force: bool,
    /// 每处理一张图片后的等待时间
    pub delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            kinds: vec![EmbeddingKind::Clip, EmbeddingKind::Color],
            force: false,
            delay: Duration::from_millis(200),
        }
    }
}

/// 单张图片的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub image_id: String,
    pub success: bool,
    /// 已有所需的向量而跳过
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    fn skipped(image_id: &str) -> Self {
        Self { image_id: image_id.to_string(), success: true, skipped: true, error: None }
    }

    fn done(image_id: &str, errors: Vec<String>) -> Self {
        let error = if errors.is_empty() { None } else { Some(errors.join("; ")) };
        Self { image_id: image_id.to_string(), success: error.is_none(), skipped: false, error }
    }
}

impl<E: EmbeddingProvider, C: ImageCatalog> VectorSearch<E, C> {
    /// 为一批图片生成向量
    ///
    /// 单张图片失败只会记录在结果中，只有向量存储不可用时才会中止整个批次。
    /// `on_item` 在每张图片处理完成后调用，可以用来更新进度。
    pub async fn generate_embeddings<F>(
        &self,
        images: &[CatalogImage],
        opts: &BatchOptions,
        mut on_item: F,
    ) -> Result<Vec<BatchItemResult>>
    where
        F: FnMut(&BatchItemResult),
    {
        if opts.kinds.is_empty() {
            return Err(SearchError::InvalidArgument("至少需要指定一种向量类型".to_string()));
        }
        self.store.ready().await?;

        let ids = images.iter().map(|image| image.image_id.clone()).collect::<Vec<_>>();
        let metadata = self.store.batch_get_metadata(&ids).await?;

        let mut results = Vec::with_capacity(images.len());
        let mut processed = 0usize;
        for image in images {
            let id = image.image_id.as_str();
            let complete = metadata.get(id).is_some_and(|m| {
                opts.kinds.iter().all(|kind| match kind {
                    EmbeddingKind::Clip => m.has_clip_embedding,
                    EmbeddingKind::Color => m.has_color_embedding,
                })
            });

            let item = if complete && !opts.force {
                debug!("跳过已有向量的图片: {id}");
                BatchItemResult::skipped(id)
            } else {
                if processed > 0 && !opts.delay.is_zero() {
                    tokio::time::sleep(opts.delay).await;
                }
                processed += 1;
                match self.process_image(image, &opts.kinds).await {
                    Ok(errors) => BatchItemResult::done(id, errors),
                    Err(e) if e.is_unavailable() => return Err(e),
                    Err(e) => {
                        warn!("处理图片 {id} 失败: {e}");
                        BatchItemResult::done(id, vec![e.to_string()])
                    }
                }
            };
            on_item(&item);
            results.push(item);
        }

        let failed = results.iter().filter(|r| !r.success).count();
        info!("处理 {} 张图片，跳过 {}，失败 {}", processed, images.len() - processed, failed);
        Ok(results)
    }

    /// 为单张图片生成向量并合并到已有记录中，返回失败的原因
    async fn process_image(&self, image: &CatalogImage, kinds: &[EmbeddingKind]) -> Result<Vec<String>> {
        let bytes = Arc::new(self.catalog.fetch_image(&image.image_id).await?);

        let mut record = self
            .store
            .get(&image.image_id)
            .await?
            .unwrap_or_else(|| ImageVectorRecord::new(&image.image_id));
        record.filename = image.filename.clone();
        record.folder = image.folder.clone();

        let mut errors = vec![];
        let mut updated = false;
        for &kind in kinds {
            let result = match kind {
                EmbeddingKind::Clip => self.embed_clip(&bytes).await.map(|v| record.clip_embedding = Some(v)),
                EmbeddingKind::Color => analyze_color(bytes.clone()).await.map(|info| {
                    record.color_histogram = Some(info.histogram);
                    record.dominant_colors = info.dominant.iter().map(|c| c.to_hex()).collect();
                    record.average_color = Some(info.average.to_hex());
                }),
            };
            match result {
                Ok(()) => updated = true,
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    warn!("为 {} 生成 {kind} 向量失败: {e}", image.image_id);
                    metrics::inc_embedding_failure(kind.as_str());
                    errors.push(format!("{kind}: {e}"));
                }
            }
        }

        if updated {
            self.store.upsert(&record).await?;
        }
        Ok(errors)
    }

    async fn embed_clip(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let vector = self
            .embedder
            .embed_image(bytes)
            .await?
            .ok_or_else(|| SearchError::UpstreamFailure("没有生成语义向量".to_string()))?;
        check_dimension(self.store.clip_dimension(), vector.len())?;
        Ok(vector)
    }
}

/// 在阻塞线程上分析图片颜色
async fn analyze_color(bytes: Arc<Vec<u8>>) -> Result<color::ColorInfo> {
    spawn_blocking(move || color::analyze(&bytes))
        .await
        .map_err(|e| SearchError::ImageDecode(format!("颜色分析任务失败: {e}")))?
        .map_err(|e| SearchError::ImageDecode(e.to_string()))
}
