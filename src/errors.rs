use std::path::PathBuf;

use thiserror::Error;

/// 核心错误类型
///
/// 输入类错误（维数不匹配、退化向量）会被立即拒绝，不会重试；
/// 结构类错误（行数不一致、索引文件缺失）对当次操作是致命的，直接上抛给调用方。
#[derive(Debug, Error)]
pub enum Error {
    /// 查询向量与索引的维数不一致，属于调用方的编程错误
    #[error("向量维数不匹配：期望 {expected} 维，实际 {actual} 维")]
    DimensionMismatch { expected: usize, actual: usize },

    /// L2 范数接近于零的向量无法归一化
    #[error("向量 L2 范数接近于零，无法归一化")]
    DegenerateVector,

    /// 构建结束后没有任何可用的行
    ///
    /// 这是一种"无数据"状态而非崩溃：调用方应当提示重新构建索引，
    /// 构建器不会落盘一个零行的索引文件
    #[error("索引为空：没有成功嵌入任何图片")]
    EmptyIndex,

    /// 向量行数与元数据行数不一致，说明索引已损坏或写入不完整
    ///
    /// 此时必须拒绝搜索，而不是返回错位的结果
    #[error("索引与元数据行数不一致：向量 {vectors} 行，元数据 {metadata} 行")]
    Alignment { vectors: usize, metadata: usize },

    /// 索引文件不存在，属于配置错误，由调用方处理
    #[error("索引文件不存在：{0}，请先执行 build 构建索引")]
    IndexNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("读取索引文件失败：{0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error("写入索引文件失败：{0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
