use sqlx::FromRow;

/// 商品记录
///
/// id 为 1 开始的插入顺序，向量索引中的行号等于 id - 1
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ProductRecord {
    /// 商品 ID
    pub id: i64,
    /// 商品条码
    pub barcode: String,
    /// 商品展示名称
    pub name: String,
    /// 本地图片路径
    pub image_path: String,
}

/// 待写入的商品元数据，一条对应索引中的一行向量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductEntry {
    pub barcode: String,
    pub name: String,
    pub image_path: String,
}
