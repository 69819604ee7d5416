use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressIterator};
use log::info;
use rayon::prelude::*;
use regex::Regex;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::task::{JoinHandle, spawn_blocking};
use tokio_tar::Archive;
use walkdir::WalkDir;

use super::types::*;
use crate::db::ProductEntry;
use crate::embed::Embedder;
use crate::index::VectorIndex;
use crate::utils::{decode_rgb, pb_style, pb_style_speed};

pub fn task_scan(
    path: PathBuf,
    pb: ProgressBar,
    regex_suf: Regex,
    limit: usize,
) -> (JoinHandle<()>, Receiver<ImageData>) {
    let (tx, rx) = channel(num_cpus::get());
    let t = tokio::spawn(async move {
        // NOTE: 这里刻意不使用 `?` 而是 unwrap，这是为了确保出错时正常崩溃
        // 如果上抛的话，上层就需要正确打印错误，太过麻烦，不如直接 panic
        if path.is_file() {
            scan_tar(path, tx, regex_suf, limit, pb).await.unwrap();
        } else {
            scan_directory(path, tx, regex_suf, limit, pb).await.unwrap();
        }
    });
    (t, rx)
}

/// 解码并嵌入图片
///
/// 解码、嵌入都在阻塞线程池上并行执行，单张图片失败只会被跳过，
/// 不会中断整个构建
pub fn task_embed(
    mut lrx: Receiver<ImageData>,
    pb: ProgressBar,
    embedder: Arc<dyn Embedder>,
    max_size: u32,
) -> (JoinHandle<()>, Receiver<EmbeddedImage>) {
    let (tx, rx) = channel(num_cpus::get());
    let t = spawn_blocking(move || {
        let mut buffer = vec![];
        let tx = &tx;
        let pb = &pb;
        let embedder = &embedder;
        // NOTE: 一次读取 cpu * 4 组数据，等待这一批处理完再读取下一批，
        // 避免把整个图片目录一次性读进内存
        while lrx.blocking_recv_many(&mut buffer, num_cpus::get() * 4) != 0 {
            buffer.par_drain(..).for_each(|data| {
                let image = match decode_rgb(&data.data, max_size) {
                    Ok(image) => image,
                    Err(_) => {
                        pb.set_message(format!("解码图片失败: {}", data.path));
                        pb.inc(1);
                        return;
                    }
                };
                match embedder.embed(&image) {
                    Ok(vector) => {
                        tx.blocking_send(EmbeddedImage {
                            path: data.path,
                            hash: blake3::hash(&data.data),
                            vector,
                        })
                        .unwrap();
                    }
                    Err(e) => {
                        pb.set_message(format!("嵌入图片失败: {}: {}", data.path, e));
                        pb.inc(1);
                    }
                }
            });
        }
    });
    (t, rx)
}

/// 汇总嵌入结果
///
/// 单消费者串行追加，保证向量行和元数据行一一对应；
/// 行的插入顺序由上游到达顺序决定，对搜索没有语义影响
pub fn task_add(
    mut lrx: Receiver<EmbeddedImage>,
    pb: ProgressBar,
    dim: usize,
    catalog: HashMap<String, String>,
) -> JoinHandle<(Vec<ProductEntry>, VectorIndex)> {
    tokio::spawn(async move {
        let mut entries = vec![];
        let mut index = VectorIndex::new(dim);
        let mut seen = HashSet::new();

        while let Some(data) = lrx.recv().await {
            if !seen.insert(data.hash) {
                pb.set_message(format!("跳过重复图片: {}", data.path));
                pb.inc(1);
                continue;
            }

            // 归一化在 push 内完成，退化向量（全零嵌入）在这里被过滤掉
            if let Err(e) = index.push(&data.vector) {
                pb.set_message(format!("向量无效: {}: {}", data.path, e));
                pb.inc(1);
                continue;
            }

            let barcode = barcode_of(&data.path);
            let name = catalog.get(&barcode).cloned().unwrap_or_default();
            entries.push(ProductEntry { barcode, name, image_path: data.path.clone() });

            pb.set_message(data.path);
            pb.inc(1);
        }

        (entries, index)
    })
}

/// 从图片路径推导商品条码，即不带后缀的文件名
fn barcode_of(path: &str) -> String {
    PathBuf::from(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

async fn scan_directory(
    path: PathBuf,
    tx: Sender<ImageData>,
    regex_suf: Regex,
    limit: usize,
    pb: ProgressBar,
) -> Result<()> {
    info!("开始扫描目录: {}", path.display());
    let pb2 = ProgressBar::no_length().with_style(pb_style());
    let mut entries = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .progress_with(pb2)
        .filter_map(|entry| {
            entry.ok().and_then(|entry| {
                let path = entry.path();
                if path.is_file() {
                    if let Some(ext) = path.extension() {
                        if regex_suf.is_match(&ext.to_string_lossy()) {
                            return Some(path.to_string_lossy().to_string());
                        }
                    }
                }
                None
            })
        })
        .collect::<Vec<_>>();
    if limit > 0 && entries.len() > limit {
        entries.truncate(limit);
    }
    info!("扫描完成，共 {} 张图片", entries.len());

    pb.set_length(entries.len() as u64);

    futures::stream::iter(entries)
        .for_each_concurrent(32, |entry| async {
            if let Ok(data) = tokio::fs::read(&entry).await {
                tx.send(ImageData { path: entry, data }).await.unwrap();
            }
        })
        .await;

    Ok(())
}

async fn scan_tar(
    path: PathBuf,
    tx: Sender<ImageData>,
    regex_suf: Regex,
    limit: usize,
    pb: ProgressBar,
) -> Result<()> {
    info!("开始扫描归档: {}", path.display());
    let file = File::open(path).await?;
    let mut archive = Archive::new(file);
    let mut entries = archive.entries()?;

    pb.set_style(pb_style_speed());

    let mut count = 0;
    // NOTE: tar 的 entries 必须按顺序读取，不能乱序并发
    while let Some(entry) = entries.next().await {
        if limit > 0 && count >= limit {
            break;
        }
        let mut entry = entry?;
        let path = entry.path()?;
        // 跳过不符合条件的文件
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let Some(ext) = path.extension() else {
            continue;
        };
        if !regex_suf.is_match(&ext.to_string_lossy()) {
            continue;
        }

        let path = path.to_string_lossy().to_string();

        let mut data = Vec::with_capacity(entry.header().size()? as usize);
        entry.read_to_end(&mut data).await?;

        tx.send(ImageData { path, data }).await.unwrap();
        count += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barcode_of() {
        assert_eq!(barcode_of("images/0123456789012.jpg"), "0123456789012");
        assert_eq!(barcode_of("a/b/c.webp"), "c");
    }
}
