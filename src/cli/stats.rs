use clap::Parser;

use crate::MatchDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::errors::Error;
use crate::index::VectorIndex;

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = MatchDBBuilder::new(opts.conf_dir.clone()).open().await?;
        let products = db.product_count().await?;

        match VectorIndex::load(db.conf_dir().vectors()) {
            Ok(index) => {
                println!("索引行数: {}", index.len());
                println!("向量维数: {}", index.dim());
                println!("商品数量: {}", products);
                let aligned = if index.len() == products { "一致" } else { "不一致" };
                println!("行对齐: {}", aligned);
            }
            Err(Error::IndexNotFound(_)) => {
                println!("索引尚未构建，商品数量: {}", products);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }
}
