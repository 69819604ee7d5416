use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum_auth::AuthBearer;
use axum_typed_multipart::TypedMultipart;
use log::info;
use ndarray::Array1;
use rayon::prelude::*;
use serde_json::{Value, json};
use tokio::task::block_in_place;

use super::error::{AppError, Result};
use super::state::AppState;
use super::types::*;
use crate::embed::Embedder;
use crate::{index, metrics, utils};

/// 搜索一张或多张照片
#[utoipa::path(
    post,
    path = "/search",
    request_body(content = SearchForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SearchResponse),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    data: TypedMultipart<SearchRequest>,
) -> Result<Json<Value>> {
    if token != state.token {
        return Err(AppError::unauthorized());
    }

    let count = data.count.unwrap_or(state.search.count);
    let min_score = data.min_score.unwrap_or(state.search.min_score);

    let start = Instant::now();

    info!("正在搜索上传图片");

    // 解码、嵌入、归一化都是阻塞计算，放到 blocking 线程上并行处理
    let queries = block_in_place(|| {
        data.file
            .par_iter()
            .map(|file| {
                let image = utils::decode_rgb(file, state.embed.max_size)?;
                let mut vector = state.embedder.embed(&image)?;
                index::normalize(&mut vector)?;
                Ok(Array1::from(vector))
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let index = state.index.read().await;
    let mut result = Vec::with_capacity(queries.len());
    for query in &queries {
        let matches = state.db.search(&index, query.view(), count, min_score).await?;
        metrics::inc_image_count();
        if let Some(best) = matches.first() {
            metrics::observe_max_score(best.score);
        }
        result.push(matches);
    }

    let elapsed = start.elapsed();
    if !queries.is_empty() {
        metrics::observe_search_duration(elapsed.as_secs_f32() / queries.len() as f32);
    }

    Ok(Json(json!({
        "time": elapsed.as_millis() as u64,
        "result": result,
    })))
}

/// 重新加载磁盘上的索引
#[utoipa::path(post, path = "/reload")]
pub async fn reload_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
) -> Result<()> {
    if token != state.token {
        return Err(AppError::unauthorized());
    }

    let mut lock = state.index.write().await;
    // NOTE: load_index 内部会重新校验行对齐，加载失败时保留旧索引
    *lock = state.db.load_index().await?;
    info!("索引已重新加载：{} 行", lock.len());
    Ok(())
}

/// 获取索引状态
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, body = StatsResponse),
    )
)]
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>> {
    let index = state.index.read().await;
    Ok(Json(StatsResponse {
        rows: index.len(),
        dim: index.dim(),
        products: state.db.product_count().await?,
    }))
}
