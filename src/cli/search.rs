use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::debug;
use ndarray::Array1;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{EmbedOptions, Opts, SearchOptions};
use crate::embed::{Embedder, RemoteEmbedder};
use crate::matchdb::Match;
use crate::{MatchDBBuilder, index, utils};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub embed: EmbedOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 被搜索的照片路径
    pub image: String,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = MatchDBBuilder::new(opts.conf_dir.clone()).open().await?;
        // 先加载索引：索引缺失或行不对齐时，没有必要再去请求嵌入服务
        let index = db.load_index().await?;

        let embedder = RemoteEmbedder::new(&self.embed)?;
        let query = block_in_place(|| -> Result<_> {
            let data = std::fs::read(&self.image)?;
            let image = utils::decode_rgb(&data, self.embed.max_size)?;
            let mut vector = embedder.embed(&image)?;
            index::normalize(&mut vector)?;
            Ok(Array1::from(vector))
        })?;
        debug!("查询向量维数: {}", query.len());

        let result =
            db.search(&index, query.view(), self.search.count, self.search.min_score).await?;

        print_result(&result, self)
    }
}

fn print_result(result: &[Match], opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for m in result {
                println!("{:>2}) {:.3}\t[{}] {}", m.rank, m.score, m.barcode, m.name);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}
