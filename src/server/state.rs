use std::sync::Arc;

use crate::catalog::DirCatalog;
use crate::cli::server::ServerCommand;
use crate::embed::ScriptEmbedder;
use crate::search::VectorSearch;

/// 应用状态
pub struct AppState {
    /// 向量搜索服务
    pub db: VectorSearch<ScriptEmbedder, DirCatalog>,
    /// 默认返回的结果数量
    pub count: usize,
    /// 默认返回的“陌生图片”数量
    pub strangers: usize,
    /// 鉴权 token
    pub token: String,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(db: VectorSearch<ScriptEmbedder, DirCatalog>, opts: ServerCommand) -> Arc<Self> {
        Arc::new(AppState {
            db,
            count: opts.search.count as usize,
            strangers: opts.search.strangers as usize,
            token: opts.token,
        })
    }
}
