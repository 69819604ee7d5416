use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "", "snapmatch").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

#[derive(Parser, Debug, Clone)]
pub struct EmbedOptions {
    /// 嵌入服务地址
    #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:8901")]
    pub embed_url: String,
    /// 嵌入模型名称
    #[arg(long, value_name = "NAME", default_value = "ViT-B-32")]
    pub embed_model: String,
    /// 嵌入向量维数
    #[arg(long, value_name = "DIM", default_value_t = 512)]
    pub embed_dim: usize,
    /// 嵌入请求超时，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub embed_timeout: u64,
    /// 图片最大边长，超过这个尺寸则等比缩放后再嵌入
    #[arg(short = 'S', long, value_name = "SIZE", default_value_t = 1024)]
    pub max_size: u32,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 返回的匹配数量
    #[arg(short = 'k', long, value_name = "K", default_value_t = 5)]
    pub count: usize,
    /// 最低相似度分数，范围从 0 到 1，低于该值的结果会被过滤
    #[arg(long, value_name = "SCORE", default_value_t = 0.0)]
    pub min_score: f32,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "snapmatch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// snapmatch 配置文件目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 扫描商品图片并构建视觉索引
    Build(BuildCommand),
    /// 用一张照片在索引中搜索相似商品
    Search(SearchCommand),
    /// 启动 HTTP 搜索服务
    Server(ServerCommand),
    /// 查看索引状态
    Stats(StatsCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回元数据数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("snapmatch.db")
    }

    /// 返回向量索引文件的路径
    pub fn vectors(&self) -> PathBuf {
        self.path.join("vectors.npy")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
