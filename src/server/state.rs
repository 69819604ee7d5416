use std::sync::Arc;

use tokio::sync::RwLock;

use crate::MatchDB;
use crate::cli::server::ServerCommand;
use crate::config::{EmbedOptions, SearchOptions};
use crate::embed::RemoteEmbedder;
use crate::index::VectorIndex;

/// 应用状态
pub struct AppState {
    /// 已加载的向量索引，reload 时整体替换
    pub index: RwLock<VectorIndex>,
    /// 元数据数据库
    pub db: MatchDB,
    /// 嵌入服务客户端
    pub embedder: Arc<RemoteEmbedder>,
    /// 嵌入配置选项
    pub embed: EmbedOptions,
    /// 搜索配置选项
    pub search: SearchOptions,
    /// 鉴权 token
    pub token: String,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        index: VectorIndex,
        db: MatchDB,
        embedder: Arc<RemoteEmbedder>,
        opts: ServerCommand,
    ) -> Arc<Self> {
        Arc::new(AppState {
            index: RwLock::new(index),
            db,
            embedder,
            embed: opts.embed,
            search: opts.search,
            token: opts.token,
        })
    }
}
