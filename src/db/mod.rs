//! Store adapters for file metadata and chunk rows.
//!
//! The orchestrators only see the [`MetadataStore`] and [`ChunkStore`]
//! traits. [`PgStore`] backs them with PostgreSQL; [`memory::MemoryStore`]
//! keeps everything in process.

use async_trait::async_trait;
use log::info;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Chunk, FileRecord};
use crate::utils::config::DatabaseConfig;

pub mod files;
pub mod file_chunks;
pub mod memory;

/// File-level records. Implementations must be safe for concurrent use.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn put_metadata(&self, record: &FileRecord) -> Result<(), StoreError>;

    async fn get_metadata(&self, file_id: Uuid) -> Result<Option<FileRecord>, StoreError>;

    /// Publishes a record once all of its chunks have been written.
    async fn mark_ready(&self, file_id: Uuid) -> Result<(), StoreError>;

    async fn list_metadata(&self) -> Result<Vec<FileRecord>, StoreError>;

    /// Removes a record together with all of its chunks.
    /// Returns `false` when no such record existed.
    async fn delete_metadata(&self, file_id: Uuid) -> Result<bool, StoreError>;
}

/// Individual chunks keyed by `(file_id, chunk_index)`.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn put_chunk(&self, chunk: &Chunk) -> Result<(), StoreError>;

    async fn get_chunk(&self, file_id: Uuid, chunk_index: i32) -> Result<Option<Chunk>, StoreError>;

    async fn delete_chunks(&self, file_id: Uuid) -> Result<u64, StoreError>;
}

pub async fn init_pool(cfg: &DatabaseConfig) -> Result<Pool<Postgres>, sqlx::Error> {
    let options = PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.dbname);

    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect_with(options)
        .await
}

/// Creates the two relations if they do not exist yet.
pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS file_metadata (
            file_id      UUID PRIMARY KEY,
            filename     TEXT NOT NULL,
            total_chunks INTEGER NOT NULL CHECK (total_chunks >= 0),
            upload_time  TIMESTAMPTZ NOT NULL DEFAULT now(),
            ready        BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS file_chunks (
            file_id     UUID NOT NULL REFERENCES file_metadata (file_id) ON DELETE CASCADE,
            chunk_index INTEGER NOT NULL CHECK (chunk_index >= 0),
            chunk_data  BYTEA NOT NULL,
            checksum    TEXT NOT NULL,
            PRIMARY KEY (file_id, chunk_index)
        )
        "#,
    )
        .execute(pool)
        .await?;

    Ok(())
}

/// PostgreSQL-backed implementation of both store traits.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Opens the connection pool, checks connectivity and applies the schema.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = init_pool(cfg).await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        migrate(&pool).await?;
        info!("Connected to database {} at {}:{}", cfg.dbname, cfg.host, cfg.port);
        Ok(Self::new(pool))
    }

    /// Waits for checked-out connections to return and closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

#[async_trait]
impl MetadataStore for PgStore {
    async fn put_metadata(&self, record: &FileRecord) -> Result<(), StoreError> {
        files::insert_file(&self.pool, record).await?;
        Ok(())
    }

    async fn get_metadata(&self, file_id: Uuid) -> Result<Option<FileRecord>, StoreError> {
        Ok(files::get_file_by_id(&self.pool, file_id).await?)
    }

    async fn mark_ready(&self, file_id: Uuid) -> Result<(), StoreError> {
        let rows = files::mark_ready(&self.pool, file_id).await?;
        if rows == 0 {
            return Err(StoreError::Constraint(format!("file {} does not exist", file_id)));
        }
        Ok(())
    }

    async fn list_metadata(&self) -> Result<Vec<FileRecord>, StoreError> {
        Ok(files::list_all_files(&self.pool).await?)
    }

    async fn delete_metadata(&self, file_id: Uuid) -> Result<bool, StoreError> {
        Ok(files::delete_file(&self.pool, file_id).await? > 0)
    }
}

#[async_trait]
impl ChunkStore for PgStore {
    async fn put_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        file_chunks::insert_chunk(&self.pool, chunk).await?;
        Ok(())
    }

    async fn get_chunk(&self, file_id: Uuid, chunk_index: i32) -> Result<Option<Chunk>, StoreError> {
        Ok(file_chunks::get_chunk(&self.pool, file_id, chunk_index).await?)
    }

    async fn delete_chunks(&self, file_id: Uuid) -> Result<u64, StoreError> {
        Ok(file_chunks::delete_chunks_by_file_id(&self.pool, file_id).await?)
    }
}
