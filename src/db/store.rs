use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info, warn};
use rayon::prelude::*;
use sqlx::migrate::MigrateError;
use tokio::sync::OnceCell;

use super::{ColorMetadata, Database, EmbeddingKind, ImageVectorRecord, IndexStats, SearchResult, VectorRow};
use super::{connect_db, crud, migrate};
use crate::color::{DOMINANT_COLORS, HISTOGRAM_BINS};
use crate::error::{Result, SearchError, check_dimension};
use crate::hsl::Rgb;
use crate::transform::centroid;
use crate::utils::{decode_vector, encode_vector};

/// 健康检查的超时时间
const PING_TIMEOUT: Duration = Duration::from_secs(2);
/// 直方图总和允许的误差
const HISTOGRAM_TOLERANCE: f64 = 1e-6;

/// 向量记录存储，使用 SQLite 保存向量并在查询时精确扫描
///
/// 语义向量使用余弦距离，颜色直方图使用直方图交集距离；结果按距离升序排列，
/// 距离相同时按图片 ID 排序。
pub struct VectorStore {
    pool: Database,
    clip_dimension: usize,
    initialized: OnceCell<()>,
    /// 缓存的质心以及计算时的版本号
    centroid: RwLock<Option<(u64, Arc<Vec<f32>>)>>,
    /// 每次语义向量可能发生变化时递增
    generation: AtomicU64,
}

impl VectorStore {
    /// 打开存储，不会立即连接数据库
    pub fn open(filename: impl AsRef<Path>, clip_dimension: usize) -> Self {
        Self::with_pool(connect_db(filename), clip_dimension)
    }

    pub fn with_pool(pool: Database, clip_dimension: usize) -> Self {
        Self {
            pool,
            clip_dimension,
            initialized: OnceCell::new(),
            centroid: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn clip_dimension(&self) -> usize {
        self.clip_dimension
    }

    /// 字段的向量维度
    pub fn dimension(&self, kind: EmbeddingKind) -> usize {
        match kind {
            EmbeddingKind::Clip => self.clip_dimension,
            EmbeddingKind::Color => HISTOGRAM_BINS,
        }
    }

    /// 创建索引，已存在时什么也不做
    ///
    /// 已有索引记录的语义向量维度与当前配置不一致时返回 `DimensionMismatch`。
    pub async fn ensure_index(&self) -> Result<()> {
        migrate(&self.pool).await.map_err(|e| match e {
            MigrateError::Execute(e) => SearchError::from(e),
            e => SearchError::Migrate(e),
        })?;

        let clip_dimension = self.clip_dimension.to_string();
        let color_dimension = HISTOGRAM_BINS.to_string();
        let meta = [
            ("clip_dimension", clip_dimension.as_str()),
            ("clip_metric", EmbeddingKind::Clip.metric().as_str()),
            ("color_dimension", color_dimension.as_str()),
            ("color_metric", EmbeddingKind::Color.metric().as_str()),
        ];
        let mut tx = self.pool.begin().await?;
        let mut created = false;
        for (key, value) in meta {
            created |= crud::insert_meta(&mut *tx, key, value).await?;
        }
        let stored = crud::get_meta(&mut *tx, "clip_dimension").await?;
        tx.commit().await?;

        if created {
            info!("创建向量索引，语义向量维度 {}", self.clip_dimension);
        }

        let stored = stored.and_then(|s| s.parse::<usize>().ok()).unwrap_or(self.clip_dimension);
        check_dimension(stored, self.clip_dimension)
    }

    /// 检查数据库是否可用，不会返回错误
    pub async fn is_available(&self) -> bool {
        let ping = sqlx::query("SELECT 1").execute(&self.pool);
        match tokio::time::timeout(PING_TIMEOUT, ping).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!("向量数据库不可用: {e}");
                false
            }
            Err(_) => {
                warn!("向量数据库健康检查超时");
                false
            }
        }
    }

    /// 确认数据库可用，并在第一次使用时创建索引
    pub async fn ready(&self) -> Result<()> {
        if !self.is_available().await {
            return Err(SearchError::ServiceUnavailable("无法连接向量数据库".to_string()));
        }
        self.initialized.get_or_try_init(|| self.ensure_index()).await?;
        Ok(())
    }

    /// 插入或整体替换一条记录
    pub async fn upsert(&self, record: &ImageVectorRecord) -> Result<()> {
        self.ready().await?;

        if let Some(v) = &record.clip_embedding {
            check_dimension(self.clip_dimension, v.len())?;
            if v.iter().any(|x| !x.is_finite()) {
                return Err(SearchError::InvalidArgument("语义向量包含非法值".to_string()));
            }
        }
        if let Some(h) = &record.color_histogram {
            check_histogram(h)?;
        }
        check_colors(record)?;

        let clip = record.clip_embedding.as_deref().map(encode_vector);
        let color = record.color_histogram.as_deref().map(encode_vector);
        let dominant_colors = serde_json::to_string(&record.dominant_colors)
            .map_err(|e| SearchError::InvalidArgument(e.to_string()))?;

        crud::upsert_image_vectors(
            &self.pool,
            &record.image_id,
            &record.filename,
            &record.folder,
            clip.as_deref(),
            color.as_deref(),
            &dominant_colors,
            record.average_color.as_deref(),
        )
        .await?;
        self.invalidate_centroid();

        debug!("写入向量记录: {}", record.image_id);
        Ok(())
    }

    pub async fn get(&self, image_id: &str) -> Result<Option<ImageVectorRecord>> {
        self.ready().await?;
        crud::get_image_vectors(&self.pool, image_id)
            .await?
            .map(ImageVectorRecord::try_from)
            .transpose()
    }

    /// 删除记录，返回记录是否存在
    pub async fn delete(&self, image_id: &str) -> Result<bool> {
        self.ready().await?;
        let deleted = crud::delete_image_vectors(&self.pool, image_id).await?;
        if deleted {
            self.invalidate_centroid();
        }
        Ok(deleted)
    }

    /// 最近邻查询，按距离升序
    pub async fn query(
        &self,
        kind: EmbeddingKind,
        vector: &[f32],
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        self.scan(kind, vector, k, exclude, false).await
    }

    /// 最远邻查询，按距离降序
    pub async fn query_farthest(
        &self,
        kind: EmbeddingKind,
        vector: &[f32],
        k: usize,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        self.scan(kind, vector, k, exclude, true).await
    }

    async fn scan(
        &self,
        kind: EmbeddingKind,
        vector: &[f32],
        k: usize,
        exclude: Option<&str>,
        farthest: bool,
    ) -> Result<Vec<SearchResult>> {
        self.ready().await?;
        let dim = self.dimension(kind);
        check_dimension(dim, vector.len())?;

        let rows = self.vectors(kind).await?;
        let metric = kind.metric();
        let mut scored = rows
            .into_par_iter()
            .filter(|row| exclude != Some(row.image_id.as_str()))
            .map(|row| {
                let v = decode_vector(&row.vector)?;
                check_dimension(dim, v.len())?;
                Ok(SearchResult {
                    score: metric.distance(vector, &v),
                    image_id: row.image_id,
                    filename: Some(row.filename).filter(|s| !s.is_empty()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        scored.sort_by(|a, b| {
            let ord = if farthest { b.score.total_cmp(&a.score) } else { a.score.total_cmp(&b.score) };
            ord.then_with(|| a.image_id.cmp(&b.image_id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn vectors(&self, kind: EmbeddingKind) -> Result<Vec<VectorRow>> {
        let rows = match kind {
            EmbeddingKind::Clip => crud::get_clip_vectors(&self.pool).await?,
            EmbeddingKind::Color => crud::get_color_vectors(&self.pool).await?,
        };
        Ok(rows)
    }

    /// 批量读取元数据，不存在的图片不会出现在结果中
    pub async fn batch_get_metadata(&self, image_ids: &[String]) -> Result<HashMap<String, ColorMetadata>> {
        self.ready().await?;
        let mut result = HashMap::with_capacity(image_ids.len());
        // SQLite 默认最多 32766 个参数
        for chunk in image_ids.chunks(1000) {
            for row in crud::get_metadata_batch(&self.pool, chunk).await? {
                result.insert(row.image_id.clone(), ColorMetadata::from(row));
            }
        }
        Ok(result)
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        self.ready().await?;
        let (total, with_clip, with_color) = crud::get_counts(&self.pool).await?;
        Ok(IndexStats {
            total_images: total as u64,
            with_clip: with_clip as u64,
            with_color: with_color as u64,
            clip_dimension: self.clip_dimension,
        })
    }

    /// 所有语义向量的质心，在记录变化前一直缓存
    pub async fn centroid(&self) -> Result<Arc<Vec<f32>>> {
        let generation = self.generation.load(Ordering::Acquire);
        let cached = self.centroid.read().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some((g, c)) = cached {
            if g == generation {
                return Ok(c);
            }
        }

        self.ready().await?;
        let rows = crud::get_clip_vectors(&self.pool).await?;
        let vectors = rows.iter().map(|row| decode_vector(&row.vector)).collect::<Result<Vec<_>>>()?;
        let Some(c) = centroid(vectors.iter().map(Vec::as_slice), self.clip_dimension)? else {
            return Err(SearchError::NotFound("索引中没有任何语义向量".to_string()));
        };
        debug!("重新计算质心，共 {} 个向量", vectors.len());

        let c = Arc::new(c);
        // 计算期间记录发生变化时不写入缓存
        if self.generation.load(Ordering::Acquire) == generation {
            *self.centroid.write().unwrap_or_else(|e| e.into_inner()) = Some((generation, c.clone()));
        }
        Ok(c)
    }

    fn invalidate_centroid(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// 直方图必须为 64 维的概率分布
fn check_histogram(h: &[f32]) -> Result<()> {
    check_dimension(HISTOGRAM_BINS, h.len())?;
    if h.iter().any(|v| !v.is_finite() || *v < 0.) {
        return Err(SearchError::InvalidArgument("直方图包含负数或非法值".to_string()));
    }
    let sum = h.iter().map(|&v| v as f64).sum::<f64>();
    if (sum - 1.).abs() > HISTOGRAM_TOLERANCE {
        return Err(SearchError::InvalidArgument(format!("直方图总和为 {sum}，应当为 1")));
    }
    Ok(())
}

/// 平均色和主色调必须是十六进制颜色，主色调最多 5 个
fn check_colors(record: &ImageVectorRecord) -> Result<()> {
    if let Some(c) = &record.average_color {
        c.parse::<Rgb>()?;
    }
    if record.dominant_colors.len() > DOMINANT_COLORS {
        return Err(SearchError::InvalidArgument(format!(
            "主色调最多 {DOMINANT_COLORS} 个，实际 {}",
            record.dominant_colors.len()
        )));
    }
    for c in &record.dominant_colors {
        c.parse::<Rgb>()?;
    }
    Ok(())
}
