use anyhow::Result;
use log::{debug, info};
use ndarray::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::ConfDir;
use crate::db::{self, Database, crud};
use crate::errors::Error;
use crate::index::VectorIndex;

pub use crate::db::{ProductEntry, ProductRecord};

/// 单条匹配结果
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Match {
    /// 名次，从 1 开始
    pub rank: usize,
    /// 余弦相似度分数
    pub score: f32,
    /// 商品条码
    pub barcode: String,
    /// 商品展示名称
    pub name: String,
    /// 本地图片路径
    pub image_path: String,
}

/// MatchDB 构建器
pub struct MatchDBBuilder {
    conf_dir: ConfDir,
}

impl MatchDBBuilder {
    pub fn new(conf_dir: ConfDir) -> Self {
        Self { conf_dir }
    }

    /// 打开（必要时创建）元数据数据库，返回 MatchDB 实例
    pub async fn open(self) -> Result<MatchDB> {
        tokio::fs::create_dir_all(self.conf_dir.path()).await?;
        let db = db::init_db(self.conf_dir.database()).await?;
        Ok(MatchDB { conf_dir: self.conf_dir, db })
    }
}

/// 商品视觉索引的门面：成对管理向量索引和元数据
///
/// 实例由调用方持有并显式传递，同一进程内可以同时打开多个不同目录的
/// MatchDB，没有任何进程级的隐藏状态。
pub struct MatchDB {
    conf_dir: ConfDir,
    db: Database,
}

impl MatchDB {
    /// 从磁盘加载向量索引，并校验与元数据的行对齐
    ///
    /// 行数不一致说明索引已损坏或写入不完整，此时拒绝加载（fail closed），
    /// 而不是带着错位的数据继续搜索
    pub async fn load_index(&self) -> Result<VectorIndex> {
        let index = VectorIndex::load(self.conf_dir.vectors())?;
        let metadata = crud::count_products(&self.db).await? as usize;
        if index.len() != metadata {
            return Err(Error::Alignment { vectors: index.len(), metadata }.into());
        }
        Ok(index)
    }

    /// 整体重建索引：向量与元数据成对落盘
    ///
    /// 写入顺序：先写向量临时文件，再在一个事务里替换元数据，
    /// 最后重命名临时文件。任何一步中途失败都会在下次 load_index
    /// 时被行对齐校验拦下。
    ///
    /// 没有任何可用行时返回 [`Error::EmptyIndex`]，不落盘零行文件。
    pub async fn rebuild(&self, entries: Vec<ProductEntry>, index: &VectorIndex) -> Result<()> {
        if index.is_empty() {
            return Err(Error::EmptyIndex.into());
        }
        if entries.len() != index.len() {
            return Err(
                Error::Alignment { vectors: index.len(), metadata: entries.len() }.into()
            );
        }

        let vectors_path = self.conf_dir.vectors();
        let mut tmp = vectors_path.clone();
        tmp.set_extension("npy.tmp");

        ndarray_npy::write_npy(&tmp, index.vectors()).map_err(Error::WriteNpy)?;
        crud::replace_products(&self.db, &entries).await?;
        std::fs::rename(&tmp, &vectors_path).map_err(Error::Io)?;

        info!("索引构建完成：{} 行，{} 维", index.len(), index.dim());
        Ok(())
    }

    /// 在索引中搜索与查询向量最相似的 count 个商品
    ///
    /// 空结果表示"没有相似的商品"，而不是出错
    pub async fn search(
        &self,
        index: &VectorIndex,
        query: ArrayView1<'_, f32>,
        count: usize,
        min_score: f32,
    ) -> Result<Vec<Match>> {
        debug!("搜索 top-{}，min_score={}", count, min_score);
        let neighbors = index.search(query, count)?;

        let mut result = Vec::with_capacity(neighbors.len());
        for (i, neighbor) in neighbors.iter().enumerate() {
            if neighbor.score < min_score {
                break;
            }
            let product = crud::get_product(&self.db, neighbor.row as i64 + 1).await?;
            result.push(Match {
                rank: i + 1,
                score: neighbor.score,
                barcode: product.barcode,
                name: product.name,
                image_path: product.image_path,
            });
        }
        Ok(result)
    }

    /// 按插入顺序返回所有商品元数据
    pub async fn products(&self) -> Result<Vec<ProductRecord>> {
        Ok(crud::get_products(&self.db).await?)
    }

    /// 元数据行数
    pub async fn product_count(&self) -> Result<usize> {
        Ok(crud::count_products(&self.db).await? as usize)
    }

    pub fn conf_dir(&self) -> &ConfDir {
        &self.conf_dir
    }
}
