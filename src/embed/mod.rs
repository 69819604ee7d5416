mod remote;

use anyhow::Result;
use image::RgbImage;

pub use remote::RemoteEmbedder;

/// 图片嵌入接口
///
/// 这是核心与外部嵌入模型之间唯一的契约：输入一张 RGB 图片，
/// 输出一条 `dim()` 维的特征向量。模型选择、设备、批处理都是提供方的事，
/// 核心只负责归一化和检索。
pub trait Embedder: Send + Sync {
    /// 嵌入向量的维数
    fn dim(&self) -> usize;

    /// 将一张图片编码为特征向量，长度必须等于 `dim()`
    fn embed(&self, image: &RgbImage) -> Result<Vec<f32>>;
}
