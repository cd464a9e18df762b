//! 向量搜索入口
//!
//! [`VectorSearch`] 封装了向量存储、嵌入服务和图片目录。每个搜索函数都会先检查存储是否可用，
//! 不可用时直接返回 [`SearchError::ServiceUnavailable`]，不会调用上游服务。

mod antipode;
mod ingest;
mod method;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

pub use self::antipode::*;
pub use self::ingest::*;
pub use self::method::*;
use crate::catalog::ImageCatalog;
use crate::color::project_color;
pub use crate::db::{ColorMetadata, EmbeddingKind, ImageVectorRecord, IndexStats, SearchResult};
use crate::db::VectorStore;
use crate::embed::EmbeddingProvider;
use crate::error::{Result, SearchError};
use crate::hsl::Rgb;
use crate::metrics;
use crate::radar::ConceptCache;
use crate::transform;
use crate::utils::check_limit;

/// 语义向量默认维度
pub const DEFAULT_CLIP_DIMENSION: usize = 512;

/// “otherwise” 方法使用的固定提示词
pub const OTHERWISE_PROMPT: &str =
    "the opposite of this: unfamiliar, contrasting, inverted, unexpected, strange, alien, absurd, chaotic";

pub struct VectorSearchBuilder<E, C> {
    db_path: PathBuf,
    embedder: E,
    catalog: C,
    clip_dimension: usize,
    concepts: Option<Arc<ConceptCache>>,
}

impl<E: EmbeddingProvider, C: ImageCatalog> VectorSearchBuilder<E, C> {
    pub fn new(db_path: impl AsRef<Path>, embedder: E, catalog: C) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            embedder,
            catalog,
            clip_dimension: DEFAULT_CLIP_DIMENSION,
            concepts: None,
        }
    }

    /// 语义向量维度
    pub fn clip_dimension(mut self, dim: usize) -> Self {
        self.clip_dimension = dim;
        self
    }

    /// 使用外部创建的概念文本向量缓存
    pub fn concept_cache(mut self, cache: Arc<ConceptCache>) -> Self {
        self.concepts = Some(cache);
        self
    }

    /// 打开搜索服务
    ///
    /// 存储可用时会立即创建索引；不可用时仍然返回成功，之后的每次调用都会重新检查。
    pub async fn open(self) -> Result<VectorSearch<E, C>> {
        if self.clip_dimension == 0 {
            return Err(SearchError::InvalidArgument("语义向量维度不能为 0".to_string()));
        }
        let search = VectorSearch {
            store: VectorStore::open(&self.db_path, self.clip_dimension),
            embedder: self.embedder,
            catalog: self.catalog,
            concepts: self.concepts.unwrap_or_default(),
        };
        if search.store.is_available().await {
            search.store.ready().await?;
        } else {
            warn!("向量数据库不可用，搜索功能将被禁用: {}", self.db_path.display());
        }
        Ok(search)
    }
}

pub struct VectorSearch<E, C> {
    store: VectorStore,
    embedder: E,
    catalog: C,
    concepts: Arc<ConceptCache>,
}

/// 记录搜索耗时和不可用次数
async fn measured<T>(
    domain: Domain,
    method: &str,
    search: impl Future<Output = Result<T>>,
) -> Result<T> {
    let start = Instant::now();
    let result = search.await;
    match &result {
        Ok(_) => {
            let elapsed = start.elapsed().as_secs_f64();
            debug!("{domain}/{method} 搜索耗时 {:.2}ms", elapsed * 1000.);
            metrics::observe_search(domain.as_str(), method, elapsed);
        }
        Err(e) if e.is_unavailable() => metrics::inc_search_unavailable(domain.as_str()),
        Err(_) => {}
    }
    result
}

impl<E: EmbeddingProvider, C: ImageCatalog> VectorSearch<E, C> {
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn concept_cache(&self) -> &Arc<ConceptCache> {
        &self.concepts
    }

    /// 创建索引，已存在时什么也不做
    pub async fn ensure_vector_index(&self) -> Result<()> {
        self.store.ready().await?;
        info!("向量索引已就绪");
        Ok(())
    }

    pub async fn is_vector_search_available(&self) -> bool {
        self.store.is_available().await
    }

    /// 写入一条记录，已有记录会被整体替换
    pub async fn store_image_vectors(&self, record: &ImageVectorRecord) -> Result<()> {
        self.store.upsert(record).await
    }

    pub async fn get_image_vectors(&self, image_id: &str) -> Result<Option<ImageVectorRecord>> {
        self.store.get(image_id).await
    }

    /// 删除一条记录，返回记录是否存在
    pub async fn delete_image_vectors(&self, image_id: &str) -> Result<bool> {
        let deleted = self.store.delete(image_id).await?;
        if deleted {
            info!("删除向量记录: {image_id}");
        }
        Ok(deleted)
    }

    pub async fn batch_get_color_metadata(
        &self,
        image_ids: &[String],
    ) -> Result<HashMap<String, ColorMetadata>> {
        self.store.batch_get_metadata(image_ids).await
    }

    pub async fn get_index_stats(&self) -> Result<IndexStats> {
        self.store.stats().await
    }

    /// 使用语义向量搜索最相似的图片
    pub async fn search_by_clip(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        measured(Domain::Clip, "vector", async {
            let k = check_limit(k)?;
            self.store.query(EmbeddingKind::Clip, vector, k, None).await
        })
        .await
    }

    /// 使用颜色直方图搜索最相似的图片
    pub async fn search_by_color(&self, histogram: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        measured(Domain::Color, "histogram", async {
            let k = check_limit(k)?;
            self.store.query(EmbeddingKind::Color, histogram, k, None).await
        })
        .await
    }

    /// 将文本转换为语义向量后搜索
    pub async fn search_by_text(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        measured(Domain::Clip, "text", async {
            let k = check_limit(k)?;
            if text.trim().is_empty() {
                return Err(SearchError::InvalidArgument("搜索文本不能为空".to_string()));
            }
            self.store.ready().await?;
            let vector = self.embed_text(text).await?;
            self.store.query(EmbeddingKind::Clip, &vector, k, None).await
        })
        .await
    }

    /// 搜索与某个颜色接近的图片
    pub async fn search_by_hex_color(&self, hex: &str, k: usize) -> Result<Vec<SearchResult>> {
        measured(Domain::Color, "hex", async {
            let k = check_limit(k)?;
            let color = hex.parse::<Rgb>()?;
            self.store.query(EmbeddingKind::Color, &project_color(color), k, None).await
        })
        .await
    }

    /// 搜索与取反后的语义向量最接近的图片
    pub async fn search_clip_negated(
        &self,
        vector: &[f32],
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        measured(Domain::Clip, AntipodeMethod::Negate.as_str(), async {
            let k = check_limit(k)?;
            let query = transform::negate(vector);
            self.store.query(EmbeddingKind::Clip, &query, k, exclude).await
        })
        .await
    }

    /// 搜索语义上距离最远的图片
    pub async fn search_clip_very_stranger(
        &self,
        vector: &[f32],
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        measured(Domain::Clip, AntipodeMethod::Stranger.as_str(), async {
            let k = check_limit(k)?;
            self.store.query_farthest(EmbeddingKind::Clip, vector, k, exclude).await
        })
        .await
    }

    /// 以所有语义向量的质心为中心反射后搜索
    pub async fn search_clip_centroid_reflection(
        &self,
        vector: &[f32],
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        measured(Domain::Clip, AntipodeMethod::Reflectroid.as_str(), async {
            let k = check_limit(k)?;
            self.store.ready().await?;
            let centroid = self.store.centroid().await?;
            let query = transform::reflect(vector, &centroid)?;
            self.store.query(EmbeddingKind::Clip, &query, k, exclude).await
        })
        .await
    }

    /// 使用固定的“反义”提示词搜索
    pub async fn search_clip_otherwise(&self, k: usize, exclude: Option<&str>) -> Result<Vec<SearchResult>> {
        measured(Domain::Clip, AntipodeMethod::Otherwise.as_str(), async {
            let k = check_limit(k)?;
            self.store.ready().await?;
            let query = self.concept(OTHERWISE_PROMPT).await?;
            self.store.query(EmbeddingKind::Clip, &query, k, exclude).await
        })
        .await
    }

    /// 搜索以平均色的互补色为主的图片
    pub async fn search_color_complementary(
        &self,
        color: Rgb,
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        measured(Domain::Color, AntipodeMethod::Complementary.as_str(), async {
            let k = check_limit(k)?;
            let target = transform::complementary(color);
            debug!("互补色: {color} -> {target}");
            self.store.query(EmbeddingKind::Color, &project_color(target), k, exclude).await
        })
        .await
    }

    /// 使用反转后的直方图搜索
    pub async fn search_color_histogram_inverted(
        &self,
        histogram: &[f32],
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        measured(Domain::Color, AntipodeMethod::Histogram.as_str(), async {
            let k = check_limit(k)?;
            let query = transform::invert_histogram(histogram)?;
            self.store.query(EmbeddingKind::Color, &query, k, exclude).await
        })
        .await
    }

    /// 使用亮度反转后的平均色搜索
    pub async fn search_color_lightness_inverted(
        &self,
        color: Rgb,
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        measured(Domain::Color, AntipodeMethod::Lightness.as_str(), async {
            let k = check_limit(k)?;
            let target = transform::invert_lightness(color);
            debug!("亮度反转: {color} -> {target}");
            self.store.query(EmbeddingKind::Color, &project_color(target), k, exclude).await
        })
        .await
    }

    /// 使用负空间直方图搜索
    pub async fn search_color_negative_space(
        &self,
        histogram: &[f32],
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        measured(Domain::Color, AntipodeMethod::Negative.as_str(), async {
            let k = check_limit(k)?;
            let query = transform::negative_space(histogram)?;
            self.store.query(EmbeddingKind::Color, &query, k, exclude).await
        })
        .await
    }

    /// 计算文本向量，上游没有结果时返回错误
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self
            .embedder
            .embed_text(text)
            .await?
            .ok_or_else(|| SearchError::UpstreamFailure(format!("没有为 \"{text}\" 生成文本向量")))?;
        crate::error::check_dimension(self.store.clip_dimension(), vector.len())?;
        Ok(vector)
    }

    /// 读取提示词的文本向量，优先使用缓存
    async fn concept(&self, prompt: &str) -> Result<Arc<Vec<f32>>> {
        let embedder = &self.embedder;
        let vector = self
            .concepts
            .get_or_compute(prompt, move |p| async move { embedder.embed_text(&p).await })
            .await?;
        crate::error::check_dimension(self.store.clip_dimension(), vector.len())?;
        Ok(vector)
    }
}
