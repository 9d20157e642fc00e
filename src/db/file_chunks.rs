use bytes::Bytes;
use sqlx::{Pool, Postgres};
use crate::models::file_chunk::Chunk;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct ChunkRow {
    file_id: Uuid,
    chunk_index: i32,
    chunk_data: Vec<u8>,
    checksum: String,
}

impl From<ChunkRow> for Chunk {
    fn from(row: ChunkRow) -> Self {
        Chunk {
            file_id: row.file_id,
            chunk_index: row.chunk_index,
            data: Bytes::from(row.chunk_data),
            checksum: row.checksum,
        }
    }
}

pub async fn insert_chunk(pool: &Pool<Postgres>, chunk: &Chunk) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO file_chunks (file_id, chunk_index, chunk_data, checksum)
        VALUES ($1, $2, $3, $4)
        "#,
    )
        .bind(chunk.file_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.data[..])
        .bind(&chunk.checksum)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_chunk(pool: &Pool<Postgres>, file_id: Uuid, chunk_index: i32) -> Result<Option<Chunk>, sqlx::Error> {
    let row = sqlx::query_as::<_, ChunkRow>(
        r#"
        SELECT file_id, chunk_index, chunk_data, checksum
        FROM file_chunks
        WHERE file_id = $1 AND chunk_index = $2
        "#,
    )
        .bind(file_id)
        .bind(chunk_index)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Chunk::from))
}

pub async fn delete_chunks_by_file_id(pool: &Pool<Postgres>, file_id: Uuid) -> Result<u64, sqlx::Error> {
    let rows = sqlx::query("DELETE FROM file_chunks WHERE file_id = $1")
        .bind(file_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows)
}
