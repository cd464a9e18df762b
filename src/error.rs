use thiserror::Error;

use crate::search::EmbeddingKind;

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

/// 向量搜索相关的错误
#[derive(Debug, Error)]
pub enum SearchError {
    /// 后端索引不可用，调用方应当禁用相关功能而不是重试
    #[error("向量搜索服务不可用: {0}")]
    ServiceUnavailable(String),
    #[error("未找到: {0}")]
    NotFound(String),
    /// 图片存在，但缺少所需类型的向量
    #[error("图片 {image_id} 没有 {kind} 向量")]
    MissingEmbedding { image_id: String, kind: EmbeddingKind },
    #[error("参数无效: {0}")]
    InvalidArgument(String),
    /// 向量长度不一致，意味着索引损坏或者 schema 发生了变化
    #[error("向量维度不匹配: 期望 {expected}，实际 {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("嵌入服务调用失败: {0}")]
    UpstreamFailure(String),
    /// 图片内容无法解码或分析
    #[error("图片解码失败: {0}")]
    ImageDecode(String),
    /// 存储中的数据已损坏
    #[error("索引数据损坏: {0}")]
    Corrupted(String),
    #[error("数据库错误: {0}")]
    Storage(sqlx::Error),
    #[error("数据库迁移失败: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// 是否属于“找不到”一类的错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::MissingEmbedding { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }
}

impl From<sqlx::Error> for SearchError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::ServiceUnavailable(err.to_string())
            }
            // SQLITE_CANTOPEN
            sqlx::Error::Database(e) if e.code().as_deref() == Some("14") => {
                Self::ServiceUnavailable(err.to_string())
            }
            _ => Self::Storage(err),
        }
    }
}

/// 检查向量长度是否符合预期
pub fn check_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SearchError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
