use blake3::Hash;

/// 扫描得到的原始图片
pub struct ImageData {
    pub path: String,
    pub data: Vec<u8>,
}

/// 嵌入完成的图片
pub struct EmbeddedImage {
    pub path: String,
    /// 图片内容哈希，用于同一次构建内去重
    pub hash: Hash,
    pub vector: Vec<f32>,
}
