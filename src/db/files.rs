use sqlx::{Pool, Postgres};
use crate::models::file::FileRecord;
use uuid::Uuid;

pub async fn insert_file(pool: &Pool<Postgres>, record: &FileRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO file_metadata (file_id, filename, total_chunks, upload_time, ready)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
        .bind(record.file_id)
        .bind(&record.filename)
        .bind(record.total_chunks)
        .bind(record.created_at)
        .bind(record.ready)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_file_by_id(pool: &Pool<Postgres>, file_id: Uuid) -> Result<Option<FileRecord>, sqlx::Error> {
    let record = sqlx::query_as::<_, FileRecord>(
        r#"
        SELECT file_id, filename, total_chunks, upload_time, ready
        FROM file_metadata
        WHERE file_id = $1
        "#,
    )
        .bind(file_id)
        .fetch_optional(pool)
        .await?;
    Ok(record)
}

pub async fn mark_ready(pool: &Pool<Postgres>, file_id: Uuid) -> Result<u64, sqlx::Error> {
    let rows = sqlx::query("UPDATE file_metadata SET ready = TRUE WHERE file_id = $1")
        .bind(file_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows)
}

pub async fn list_all_files(pool: &Pool<Postgres>) -> Result<Vec<FileRecord>, sqlx::Error> {
    let records = sqlx::query_as::<_, FileRecord>(
        r#"
        SELECT file_id, filename, total_chunks, upload_time, ready
        FROM file_metadata
        ORDER BY upload_time ASC, file_id ASC
        "#,
    )
        .fetch_all(pool)
        .await?;
    Ok(records)
}

/// Deletes a record and its chunks in one transaction.
pub async fn delete_file(pool: &Pool<Postgres>, file_id: Uuid) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM file_chunks WHERE file_id = $1")
        .bind(file_id)
        .execute(&mut *tx)
        .await?;

    let rows = sqlx::query("DELETE FROM file_metadata WHERE file_id = $1")
        .bind(file_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(rows)
}
