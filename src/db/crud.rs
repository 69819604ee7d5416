use sqlx::{Result, SqlitePool};

use super::{ProductEntry, ProductRecord};

/// 整体替换商品表
///
/// 索引是整体重建的，元数据也在一个事务里整体替换，
/// 并重置自增序列，保证新插入的 id 从 1 开始与向量行号对齐
pub async fn replace_products(executor: &SqlitePool, entries: &[ProductEntry]) -> Result<()> {
    let mut tx = executor.begin().await?;
    sqlx::query("DELETE FROM product").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'product'")
        .execute(&mut *tx)
        .await?;
    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO product (barcode, name, image_path)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&entry.barcode)
        .bind(&entry.name)
        .bind(&entry.image_path)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// 根据 ID 获取商品记录
pub async fn get_product(executor: &SqlitePool, id: i64) -> Result<ProductRecord> {
    sqlx::query_as::<_, ProductRecord>(
        r#"
        SELECT id, barcode, name, image_path FROM product WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

/// 按 ID 升序获取所有商品记录
pub async fn get_products(executor: &SqlitePool) -> Result<Vec<ProductRecord>> {
    sqlx::query_as::<_, ProductRecord>(
        r#"
        SELECT id, barcode, name, image_path FROM product ORDER BY id ASC
        "#,
    )
    .fetch_all(executor)
    .await
}

/// 查询商品数量
pub async fn count_products(executor: &SqlitePool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM product")
        .fetch_one(executor)
        .await?;
    Ok(count.0)
}
