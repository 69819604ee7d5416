use anyhow::Result;
use ndarray::arr1;
use snapmatch::config::ConfDir;
use snapmatch::errors::Error;
use snapmatch::index::VectorIndex;
use snapmatch::matchdb::{MatchDB, ProductEntry};
use snapmatch::MatchDBBuilder;

fn conf_dir(dir: &assert_fs::TempDir) -> ConfDir {
    dir.path().to_string_lossy().parse().unwrap()
}

fn sample_entries() -> Vec<ProductEntry> {
    vec![
        ProductEntry {
            barcode: "0001".to_string(),
            name: "苹果汁".to_string(),
            image_path: "images/0001.jpg".to_string(),
        },
        ProductEntry {
            barcode: "0002".to_string(),
            name: "橙汁".to_string(),
            image_path: "images/0002.jpg".to_string(),
        },
        ProductEntry {
            barcode: "0003".to_string(),
            name: "混合果汁".to_string(),
            image_path: "images/0003.jpg".to_string(),
        },
    ]
}

fn sample_index() -> VectorIndex {
    let mut index = VectorIndex::new(2);
    index.push(&[1.0, 0.0]).unwrap();
    index.push(&[0.0, 1.0]).unwrap();
    index.push(&[0.707, 0.707]).unwrap();
    index
}

async fn open_db(dir: &assert_fs::TempDir) -> Result<MatchDB> {
    MatchDBBuilder::new(conf_dir(dir)).open().await
}

#[tokio::test]
async fn rebuild_and_search() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let db = open_db(&dir).await?;

    db.rebuild(sample_entries(), &sample_index()).await?;

    let index = db.load_index().await?;
    assert_eq!(index.len(), 3);

    let result = db.search(&index, arr1(&[1.0, 0.0]).view(), 3, 0.0).await?;
    assert_eq!(result.len(), 3);

    // 名次从 1 开始，自匹配排第一
    assert_eq!(result[0].rank, 1);
    assert_eq!(result[0].barcode, "0001");
    assert_eq!(result[0].name, "苹果汁");
    assert!((result[0].score - 1.0).abs() < 1e-5);

    assert_eq!(result[1].barcode, "0003");
    assert!((result[1].score - 0.707).abs() < 1e-3);

    assert_eq!(result[2].barcode, "0002");
    assert!(result[2].score.abs() < 1e-5);

    Ok(())
}

#[tokio::test]
async fn search_k_larger_than_rows() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let db = open_db(&dir).await?;
    db.rebuild(sample_entries(), &sample_index()).await?;

    let index = db.load_index().await?;
    // 请求 10 个结果，但索引只有 3 行
    let result = db.search(&index, arr1(&[1.0, 0.0]).view(), 10, 0.0).await?;
    assert_eq!(result.len(), 3);
    Ok(())
}

#[tokio::test]
async fn search_min_score_filters() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let db = open_db(&dir).await?;
    db.rebuild(sample_entries(), &sample_index()).await?;

    let index = db.load_index().await?;
    let result = db.search(&index, arr1(&[1.0, 0.0]).view(), 10, 0.5).await?;
    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|m| m.score >= 0.5));
    Ok(())
}

#[tokio::test]
async fn rebuild_empty_is_rejected() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let db = open_db(&dir).await?;

    let err = db.rebuild(vec![], &VectorIndex::new(2)).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyIndex)));

    // 空索引不应落盘任何文件
    assert!(!db.conf_dir().vectors().exists());
    Ok(())
}

#[tokio::test]
async fn rebuild_misaligned_is_rejected() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let db = open_db(&dir).await?;

    let mut entries = sample_entries();
    entries.pop();
    let err = db.rebuild(entries, &sample_index()).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Alignment { .. })));
    Ok(())
}

#[tokio::test]
async fn rebuild_is_idempotent() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let db = open_db(&dir).await?;

    db.rebuild(sample_entries(), &sample_index()).await?;
    let first = db.products().await?;

    db.rebuild(sample_entries(), &sample_index()).await?;
    let second = db.products().await?;

    // 相同的输入重建两次，元数据内容完全一致
    assert_eq!(first, second);
    assert_eq!(db.load_index().await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn load_index_missing_file() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let db = open_db(&dir).await?;

    let err = db.load_index().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::IndexNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn load_index_detects_misalignment() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let db = open_db(&dir).await?;
    db.rebuild(sample_entries(), &sample_index()).await?;

    // 模拟写入不完整：向量文件被换成了行数不一致的版本
    let mut broken = VectorIndex::new(2);
    broken.push(&[1.0, 0.0]).unwrap();
    ndarray_npy::write_npy(db.conf_dir().vectors(), broken.vectors())?;

    let err = db.load_index().await.unwrap_err();
    match err.downcast_ref::<Error>() {
        Some(Error::Alignment { vectors, metadata }) => {
            assert_eq!(*vectors, 1);
            assert_eq!(*metadata, 3);
        }
        other => panic!("expected alignment error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn two_databases_in_one_process() -> Result<()> {
    // 索引句柄由调用方持有，同一进程可以同时使用两个不同的库
    let dir1 = assert_fs::TempDir::new()?;
    let dir2 = assert_fs::TempDir::new()?;
    let db1 = open_db(&dir1).await?;
    let db2 = open_db(&dir2).await?;

    db1.rebuild(sample_entries(), &sample_index()).await?;

    let mut entries = sample_entries();
    entries.truncate(1);
    let mut index = VectorIndex::new(2);
    index.push(&[0.0, 1.0]).unwrap();
    db2.rebuild(entries, &index).await?;

    assert_eq!(db1.load_index().await?.len(), 3);
    assert_eq!(db2.load_index().await?.len(), 1);
    Ok(())
}
