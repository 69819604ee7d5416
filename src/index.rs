use std::path::Path;

use log::debug;
use ndarray::prelude::*;
use ndarray_npy::read_npy;

use crate::errors::{Error, Result};

/// 归一化时允许的最小 L2 范数，低于该值视为退化向量
pub const NORM_EPSILON: f32 = 1e-10;

/// 单条搜索结果，row 为向量在索引中的行号
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub score: f32,
}

/// 向量索引：一个 [N, D] 的 f32 稠密矩阵
///
/// 不变量：每一行都是单位向量（L2 范数为 1），由 [`VectorIndex::push`] 保证。
/// 行的顺序即插入顺序，对搜索结果没有语义影响。
#[derive(Debug)]
pub struct VectorIndex {
    vectors: Array2<f32>,
}

impl VectorIndex {
    /// 创建一个指定维数的空索引
    pub fn new(dim: usize) -> Self {
        Self { vectors: Array2::zeros((0, dim)) }
    }

    /// 索引的行数
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.nrows() == 0
    }

    /// 向量维数
    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    /// 归一化后追加一行向量
    ///
    /// 维数不一致或范数退化时返回错误，此时索引保持不变
    pub fn push(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim() {
            return Err(Error::DimensionMismatch { expected: self.dim(), actual: vector.len() });
        }
        let mut vector = vector.to_vec();
        normalize(&mut vector)?;
        self.vectors
            .push(Axis(0), ArrayView::from(&*vector))
            .expect("行维数已检查，push 不应失败");
        Ok(())
    }

    /// 搜索与查询向量最相似的 k 行
    ///
    /// 查询向量必须是与索引同维数的单位向量。两个单位向量的余弦相似度
    /// 等于点积，因此这里对每一行做一次点积，再取分数最大的 k 个。
    ///
    /// 结果按分数严格降序排列，分数相同时保持行号升序，保证确定性。
    /// k 超过行数时返回全部行；空索引返回空列表，不是错误。
    pub fn search(&self, query: ArrayView1<f32>, k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim() {
            return Err(Error::DimensionMismatch { expected: self.dim(), actual: query.len() });
        }
        if self.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        let scores = self.vectors.dot(&query);

        let mut neighbors = scores
            .iter()
            .enumerate()
            .map(|(row, &score)| Neighbor { row, score })
            .collect::<Vec<_>>();
        // 稳定排序：分数相同的行保持原始行号顺序
        neighbors.sort_by(|a, b| b.score.total_cmp(&a.score));
        neighbors.truncate(k.min(self.len()));

        Ok(neighbors)
    }

    /// 从 npy 文件加载索引
    ///
    /// 文件不存在属于配置错误，直接上抛，不做重试
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::IndexNotFound(path.to_path_buf()));
        }
        debug!("加载索引：{}", path.display());
        let vectors: Array2<f32> = read_npy(path)?;
        debug!("索引行数：{}，维数：{}", vectors.nrows(), vectors.ncols());
        Ok(Self { vectors })
    }

}

/// 原地归一化一条向量，使其 L2 范数为 1
///
/// 范数低于 [`NORM_EPSILON`] 时返回 [`Error::DegenerateVector`]，避免除零
pub fn normalize(vector: &mut [f32]) -> Result<()> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < NORM_EPSILON {
        return Err(Error::DegenerateVector);
    }
    for x in vector.iter_mut() {
        *x /= norm;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn index_3x2() -> VectorIndex {
        let mut index = VectorIndex::new(2);
        index.push(&[1.0, 0.0]).unwrap();
        index.push(&[0.0, 1.0]).unwrap();
        index.push(&[0.707, 0.707]).unwrap();
        index
    }

    #[test]
    fn test_normalize_unit_norm() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v).unwrap();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_degenerate() {
        let mut v = vec![0.0, 0.0, 0.0];
        assert!(matches!(normalize(&mut v), Err(Error::DegenerateVector)));
    }

    #[test]
    fn test_push_normalizes_rows() {
        let mut index = VectorIndex::new(4);
        index.push(&[2.0, 0.0, 0.0, 0.0]).unwrap();
        let row = index.vectors().row(0);
        assert!((row[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_push_dimension_mismatch() {
        let mut index = VectorIndex::new(4);
        let err = index.push(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 2 }));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_search_ordering() {
        // v1=[1,0] v2=[0,1] v3=[0.707,0.707]，查询 [1,0]
        // 期望顺序：v1 (1.0), v3 (~0.707), v2 (0.0)
        let index = index_3x2();
        let query = ndarray::arr1(&[1.0, 0.0]);
        let result = index.search(query.view(), 3).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].row, 0);
        assert!((result[0].score - 1.0).abs() < 1e-5);
        assert_eq!(result[1].row, 2);
        assert!((result[1].score - 0.707).abs() < 1e-3);
        assert_eq!(result[2].row, 1);
        assert!(result[2].score.abs() < 1e-5);
    }

    #[test]
    fn test_search_self_match() {
        let index = index_3x2();
        let query = index.vectors().row(2).to_owned();
        let result = index.search(query.view(), 1).unwrap();
        assert_eq!(result[0].row, 2);
        assert!((result[0].score - 1.0).abs() < 1e-5);
    }

    #[rstest]
    #[case::zero(0, 0)]
    #[case::less_than_rows(2, 2)]
    #[case::exact(3, 3)]
    #[case::more_than_rows(10, 3)]
    fn test_search_k_clamped(#[case] k: usize, #[case] expected: usize) {
        // k 超过行数时返回全部行，而不是报错或填充
        let index = index_3x2();
        let query = ndarray::arr1(&[1.0, 0.0]);
        let result = index.search(query.view(), k).unwrap();
        assert_eq!(result.len(), expected);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(2);
        let query = ndarray::arr1(&[1.0, 0.0]);
        assert!(index.search(query.view(), 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = index_3x2();
        let query = ndarray::arr1(&[1.0, 0.0, 0.0]);
        assert!(matches!(
            index.search(query.view(), 1),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_search_tie_keeps_row_order() {
        // 两行完全相同的向量，分数并列时保持行号升序
        let mut index = VectorIndex::new(2);
        index.push(&[1.0, 0.0]).unwrap();
        index.push(&[0.0, 1.0]).unwrap();
        index.push(&[1.0, 0.0]).unwrap();
        let query = ndarray::arr1(&[1.0, 0.0]);
        let result = index.search(query.view(), 3).unwrap();
        assert_eq!(result[0].row, 0);
        assert_eq!(result[1].row, 2);
        assert_eq!(result[2].row, 1);
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.npy");

        let index = index_3x2();
        ndarray_npy::write_npy(&path, index.vectors()).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dim(), 2);
        assert_eq!(loaded.vectors(), index.vectors());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorIndex::load(dir.path().join("vectors.npy")).unwrap_err();
        assert!(matches!(err, Error::IndexNotFound(_)));
    }
}
