use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChunkStore, MetadataStore};
use crate::error::StoreError;
use crate::models::{Chunk, FileRecord};

/// Process-local store with the same constraints as the SQL schema:
/// unique file ids, unique `(file_id, chunk_index)` keys, and chunks that
/// may only reference an existing record.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    files: HashMap<Uuid, FileRecord>,
    chunks: HashMap<Uuid, BTreeMap<i32, Chunk>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunk rows stored under `file_id`.
    pub async fn chunk_count(&self, file_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .chunks
            .get(&file_id)
            .map_or(0, BTreeMap::len)
    }

    /// Drops a single chunk row, leaving its record untouched.
    pub async fn remove_chunk(&self, file_id: Uuid, chunk_index: i32) -> Option<Chunk> {
        self.inner
            .write()
            .await
            .chunks
            .get_mut(&file_id)
            .and_then(|chunks| chunks.remove(&chunk_index))
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn put_metadata(&self, record: &FileRecord) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        if tables.files.contains_key(&record.file_id) {
            return Err(StoreError::Constraint(format!("file {} already exists", record.file_id)));
        }
        tables.files.insert(record.file_id, record.clone());
        Ok(())
    }

    async fn get_metadata(&self, file_id: Uuid) -> Result<Option<FileRecord>, StoreError> {
        Ok(self.inner.read().await.files.get(&file_id).cloned())
    }

    async fn mark_ready(&self, file_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        match tables.files.get_mut(&file_id) {
            Some(record) => {
                record.ready = true;
                Ok(())
            }
            None => Err(StoreError::Constraint(format!("file {} does not exist", file_id))),
        }
    }

    async fn list_metadata(&self) -> Result<Vec<FileRecord>, StoreError> {
        let mut records: Vec<FileRecord> = self.inner.read().await.files.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.file_id.cmp(&b.file_id)));
        Ok(records)
    }

    async fn delete_metadata(&self, file_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.inner.write().await;
        tables.chunks.remove(&file_id);
        Ok(tables.files.remove(&file_id).is_some())
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn put_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        if !tables.files.contains_key(&chunk.file_id) {
            return Err(StoreError::Constraint(format!(
                "chunk {} references unknown file {}",
                chunk.chunk_index, chunk.file_id
            )));
        }
        let chunks = tables.chunks.entry(chunk.file_id).or_default();
        if chunks.contains_key(&chunk.chunk_index) {
            return Err(StoreError::Constraint(format!(
                "chunk {} of file {} already exists",
                chunk.chunk_index, chunk.file_id
            )));
        }
        chunks.insert(chunk.chunk_index, chunk.clone());
        Ok(())
    }

    async fn get_chunk(&self, file_id: Uuid, chunk_index: i32) -> Result<Option<Chunk>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .chunks
            .get(&file_id)
            .and_then(|chunks| chunks.get(&chunk_index))
            .cloned())
    }

    async fn delete_chunks(&self, file_id: Uuid) -> Result<u64, StoreError> {
        let removed = self.inner.write().await.chunks.remove(&file_id);
        Ok(removed.map_or(0, |chunks| chunks.len() as u64))
    }
}
