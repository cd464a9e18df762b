use sqlx::{Executor, QueryBuilder, Result, Sqlite};

use super::{ImageVectorRow, MetadataRow, VectorRow};

/// 读取索引元信息
pub async fn get_meta<'c, E>(executor: E, key: &str) -> Result<Option<String>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?")
        .bind(key)
        .fetch_optional(executor)
        .await
}

/// 写入索引元信息，已存在时保持不变
pub async fn insert_meta<'c, E>(executor: E, key: &str, value: &str) -> Result<bool>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query("INSERT OR IGNORE INTO index_meta (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// 插入或整体替换一条向量记录
#[allow(clippy::too_many_arguments)]
pub async fn upsert_image_vectors<'c, E>(
    executor: E,
    image_id: &str,
    filename: &str,
    folder: &str,
    clip_embedding: Option<&[u8]>,
    color_histogram: Option<&[u8]>,
    dominant_colors: &str,
    average_color: Option<&str>,
) -> Result<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO image_vectors
            (image_id, filename, folder, clip_embedding, color_histogram, dominant_colors, average_color, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, CAST(strftime('%s', 'now') AS INTEGER))
        ON CONFLICT (image_id) DO UPDATE SET
            filename = excluded.filename,
            folder = excluded.folder,
            clip_embedding = excluded.clip_embedding,
            color_histogram = excluded.color_histogram,
            dominant_colors = excluded.dominant_colors,
            average_color = excluded.average_color,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(image_id)
    .bind(filename)
    .bind(folder)
    .bind(clip_embedding)
    .bind(color_histogram)
    .bind(dominant_colors)
    .bind(average_color)
    .execute(executor)
    .await?;
    Ok(())
}

/// 根据 ID 获取向量记录
pub async fn get_image_vectors<'c, E>(executor: E, image_id: &str) -> Result<Option<ImageVectorRow>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT image_id, filename, folder, clip_embedding, color_histogram, dominant_colors, average_color
        FROM image_vectors WHERE image_id = ?
        "#,
    )
    .bind(image_id)
    .fetch_optional(executor)
    .await
}

/// 删除向量记录，返回是否确实删除了记录
pub async fn delete_image_vectors<'c, E>(executor: E, image_id: &str) -> Result<bool>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM image_vectors WHERE image_id = ?")
        .bind(image_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// 获取所有语义向量
pub async fn get_clip_vectors<'c, E>(executor: E) -> Result<Vec<VectorRow>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT image_id, filename, clip_embedding AS vector
        FROM image_vectors WHERE clip_embedding IS NOT NULL
        "#,
    )
    .fetch_all(executor)
    .await
}

/// 获取所有颜色直方图
pub async fn get_color_vectors<'c, E>(executor: E) -> Result<Vec<VectorRow>>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT image_id, filename, color_histogram AS vector
        FROM image_vectors WHERE color_histogram IS NOT NULL
        "#,
    )
    .fetch_all(executor)
    .await
}

/// 批量获取元数据，不存在的 ID 不会出现在结果中
pub async fn get_metadata_batch<'c, E>(executor: E, image_ids: &[String]) -> Result<Vec<MetadataRow>>
where
    E: Executor<'c, Database = Sqlite>,
{
    if image_ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT image_id,
               clip_embedding IS NOT NULL AS has_clip,
               color_histogram IS NOT NULL AS has_color,
               dominant_colors,
               average_color
        FROM image_vectors WHERE image_id IN (
        "#,
    );
    let mut separated = builder.separated(", ");
    for id in image_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
    builder.build_query_as::<MetadataRow>().fetch_all(executor).await
}

/// 查询记录总数以及拥有各类向量的记录数
pub async fn get_counts<'c, E>(executor: E) -> Result<(i64, i64, i64)>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(clip_embedding),
               COUNT(color_histogram)
        FROM image_vectors
        "#,
    )
    .fetch_one(executor)
    .await
}
