use axum::body::Bytes;
use axum_typed_multipart::TryFromMultipart;
use serde::Serialize;
use utoipa::ToSchema;

use crate::matchdb::Match;

/// 搜索请求参数
#[derive(TryFromMultipart)]
pub struct SearchRequest {
    pub file: Vec<Bytes>,
    pub count: Option<usize>,
    pub min_score: Option<f32>,
}

/// 搜索表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SearchForm {
    /// 上传的照片文件，可以是多张
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// 返回的匹配数量
    pub count: Option<usize>,
    /// 最低相似度分数
    pub min_score: Option<f32>,
}

/// 搜索响应
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// 搜索耗时，单位为毫秒
    pub time: u64,
    /// 每张照片的匹配结果
    pub result: Vec<Vec<Match>>,
}

/// 索引状态响应
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// 索引行数
    pub rows: usize,
    /// 向量维数
    pub dim: usize,
    /// 商品元数据行数
    pub products: usize,
}
