use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use indicatif::ProgressBar;
use log::info;
use regex::Regex;
use tasks::*;

mod tasks;
mod types;

use crate::MatchDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{EmbedOptions, Opts};
use crate::embed::{Embedder, RemoteEmbedder};
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    /// 商品图片所在目录，也支持扫描 tar 归档文件
    /// 图片文件名（不含后缀）会被当作商品条码
    #[arg(verbatim_doc_comment)]
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,png,webp")]
    pub suffix: String,
    /// 商品目录文件（JSON 对象，条码 → 展示名称），用于填充商品名称
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,
    /// 最多处理的图片数量，0 表示不限制
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub limit: usize,
}

impl SubCommandExtend for BuildCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let re_suf = format!("(?i)({})", self.suffix.replace(',', "|"));
        let re_suf = Regex::new(&re_suf).expect("failed to build regex");

        let catalog: HashMap<String, String> = match &self.catalog {
            Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
            None => HashMap::new(),
        };

        let embedder: Arc<dyn Embedder> = Arc::new(RemoteEmbedder::new(&self.embed)?);
        let db = MatchDBBuilder::new(opts.conf_dir.clone()).open().await?;

        let pb = ProgressBar::no_length().with_style(pb_style());

        let (t1, rx) = task_scan(self.path.clone(), pb.clone(), re_suf, self.limit);
        let (t2, rx) = task_embed(rx, pb.clone(), embedder.clone(), self.embed.max_size);
        let t3 = task_add(rx, pb.clone(), embedder.dim(), catalog);

        // 等待所有任务完成
        let (_, _, (entries, index)) = tokio::try_join!(t1, t2, t3)?;

        pb.finish_with_message("图片嵌入完成");

        // 索引是整体重建的：零行时这里会报告空索引错误，而不是落盘空文件
        db.rebuild(entries, &index).await?;
        info!("索引构建成功");

        Ok(())
    }
}
