//! 图片目录（外部协作方）：提供图片内容和标签，这里只读不写

use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};

use log::{debug, info};
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Result, SearchError};
use crate::search::Domain;

/// 从所有相似搜索结果中排除
pub const TAG_EXCLUDE_ALL: &str = "no-similar";
/// 只从语义搜索结果中排除
pub const TAG_EXCLUDE_CLIP: &str = "no-similar-clip";
/// 只从颜色搜索结果中排除
pub const TAG_EXCLUDE_COLOR: &str = "no-similar-color";

/// 目录中的一张图片
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogImage {
    pub image_id: String,
    pub filename: String,
    pub folder: String,
}

pub trait ImageCatalog: Send + Sync {
    /// 列出所有图片
    fn list_images(&self) -> impl Future<Output = Result<Vec<CatalogImage>>> + Send;

    /// 读取图片内容
    fn fetch_image(&self, image_id: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// 批量读取图片标签，没有标签的图片可以不出现在结果中
    fn tags(
        &self,
        image_ids: &[String],
    ) -> impl Future<Output = Result<HashMap<String, Vec<String>>>> + Send;
}

/// 判断带有这些标签的图片是否应当从某个搜索域中排除
pub fn is_excluded<S: AsRef<str>>(domain: Domain, tags: &[S]) -> bool {
    let domain_tag = match domain {
        Domain::Clip => TAG_EXCLUDE_CLIP,
        Domain::Color => TAG_EXCLUDE_COLOR,
    };
    tags.iter().any(|t| t.as_ref() == TAG_EXCLUDE_ALL || t.as_ref() == domain_tag)
}

/// 以本地目录作为图片目录
///
/// 图片 ID 为相对根目录、以 `/` 分隔的路径；标签从根目录下可选的 `tags.json` 读取，
/// 格式为 `{ "图片 ID": ["标签", ...] }`。
#[derive(Debug, Clone)]
pub struct DirCatalog {
    root: PathBuf,
    suffix: Regex,
    tags: HashMap<String, Vec<String>>,
}

impl DirCatalog {
    pub const TAGS_FILE: &'static str = "tags.json";

    /// 打开目录，`suffix` 为逗号分隔的文件后缀
    pub fn open(root: impl AsRef<Path>, suffix: &str) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let re = format!("(?i)^({})$", suffix.replace(',', "|"));
        let suffix = Regex::new(&re)
            .map_err(|e| SearchError::InvalidArgument(format!("无效的后缀列表 {suffix}: {e}")))?;

        let tags_file = root.join(Self::TAGS_FILE);
        let tags = if tags_file.is_file() {
            let data = std::fs::read(&tags_file)?;
            let tags: HashMap<String, Vec<String>> = serde_json::from_slice(&data).map_err(|e| {
                SearchError::InvalidArgument(format!("无法解析 {}: {e}", tags_file.display()))
            })?;
            info!("读取 {} 张图片的标签", tags.len());
            tags
        } else {
            HashMap::new()
        };

        Ok(Self { root, suffix, tags })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 将图片 ID 转换为文件路径，拒绝越出根目录的 ID
    fn resolve(&self, image_id: &str) -> Result<PathBuf> {
        let rel = Path::new(image_id);
        if image_id.is_empty() || rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(SearchError::InvalidArgument(format!("非法的图片 ID: {image_id}")));
        }
        Ok(self.root.join(rel))
    }

    fn to_catalog_image(&self, path: &Path) -> Option<CatalogImage> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>();
        let (filename, folder) = parts.split_last()?;
        Some(CatalogImage {
            image_id: parts.join("/"),
            filename: filename.to_string(),
            folder: folder.join("/"),
        })
    }
}

impl ImageCatalog for DirCatalog {
    async fn list_images(&self) -> Result<Vec<CatalogImage>> {
        info!("开始扫描目录: {}", self.root.display());
        let mut images = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| self.suffix.is_match(&ext.to_string_lossy()))
            })
            .filter_map(|entry| self.to_catalog_image(entry.path()))
            .collect::<Vec<_>>();
        images.sort_by(|a, b| a.image_id.cmp(&b.image_id));
        info!("扫描完成，共 {} 张图片", images.len());
        Ok(images)
    }

    async fn fetch_image(&self, image_id: &str) -> Result<Vec<u8>> {
        let path = self.resolve(image_id)?;
        debug!("读取图片: {}", path.display());
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SearchError::NotFound(format!("图片 {image_id}")),
            _ => e.into(),
        })
    }

    async fn tags(&self, image_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        Ok(image_ids
            .iter()
            .filter_map(|id| self.tags.get(id).map(|tags| (id.clone(), tags.clone())))
            .collect())
    }
}
