#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use antipode::catalog::{CatalogImage, ImageCatalog};
use antipode::color::project_color;
use antipode::embed::EmbeddingProvider;
use antipode::hsl::Rgb;
use antipode::search::ImageVectorRecord;
use antipode::{Result, SearchError, VectorSearch, VectorSearchBuilder};
use tempfile::TempDir;

pub const DIM: usize = 4;

/// 固定输出的嵌入服务
///
/// 图片向量由字节长度决定，文本向量由首字母决定，并记录图片调用次数。
#[derive(Debug, Clone, Default)]
pub struct FakeEmbedder {
    pub image_calls: Arc<AtomicUsize>,
}

impl FakeEmbedder {
    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for FakeEmbedder {
    async fn embed_image(&self, image: &[u8]) -> Result<Option<Vec<f32>>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(vec![1.0, image.len() as f32 / 100.0, 0.0, 0.0]))
    }

    async fn embed_text(&self, text: &str) -> Result<Option<Vec<f32>>> {
        let seed = text.bytes().map(|b| b as f32).sum::<f32>();
        Ok(Some(vec![1.0, (seed % 7.0) - 3.0, (seed % 5.0) - 2.0, 0.5]))
    }
}

/// 内存中的图片目录
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    pub images: HashMap<String, Vec<u8>>,
    pub tags: HashMap<String, Vec<String>>,
}

impl StaticCatalog {
    pub fn with_image(mut self, image_id: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(image_id.to_string(), bytes);
        self
    }

    pub fn with_tag(mut self, image_id: &str, tag: &str) -> Self {
        self.tags.entry(image_id.to_string()).or_default().push(tag.to_string());
        self
    }
}

impl ImageCatalog for StaticCatalog {
    async fn list_images(&self) -> Result<Vec<CatalogImage>> {
        let mut images = self
            .images
            .keys()
            .map(|id| CatalogImage { image_id: id.clone(), filename: id.clone(), folder: String::new() })
            .collect::<Vec<_>>();
        images.sort_by(|a, b| a.image_id.cmp(&b.image_id));
        Ok(images)
    }

    async fn fetch_image(&self, image_id: &str) -> Result<Vec<u8>> {
        self.images.get(image_id).cloned().ok_or_else(|| SearchError::NotFound(image_id.to_string()))
    }

    async fn tags(&self, image_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        Ok(image_ids
            .iter()
            .filter_map(|id| self.tags.get(id).map(|t| (id.clone(), t.clone())))
            .collect())
    }
}

pub type TestSearch = VectorSearch<FakeEmbedder, StaticCatalog>;

pub async fn open(dir: &TempDir, catalog: StaticCatalog) -> (TestSearch, FakeEmbedder) {
    open_at(&dir.path().join("test.db"), catalog).await
}

pub async fn open_at(path: &Path, catalog: StaticCatalog) -> (TestSearch, FakeEmbedder) {
    let embedder = FakeEmbedder::default();
    let db = VectorSearchBuilder::new(path, embedder.clone(), catalog)
        .clip_dimension(DIM)
        .open()
        .await
        .unwrap();
    (db, embedder)
}

/// 同时带有语义向量和纯色直方图的记录
pub fn record(image_id: &str, clip: [f32; DIM], color: Rgb) -> ImageVectorRecord {
    ImageVectorRecord {
        image_id: image_id.to_string(),
        filename: format!("{image_id}.jpg"),
        folder: String::new(),
        clip_embedding: Some(clip.to_vec()),
        color_histogram: Some(project_color(color)),
        dominant_colors: vec![color.to_hex()],
        average_color: Some(color.to_hex()),
    }
}

pub fn dataset(name: &str) -> Vec<u8> {
    std::fs::read(Path::new("tests/dataset").join(name)).unwrap()
}
