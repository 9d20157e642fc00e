#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chunked_file_storage::db::memory::MemoryStore;
use chunked_file_storage::db::ChunkStore;
use chunked_file_storage::models::Chunk;
use chunked_file_storage::{ChunkSettings, FileService, StoreError};
use uuid::Uuid;

pub fn settings(chunk_size: usize, max_concurrency: usize) -> ChunkSettings {
    ChunkSettings {
        chunk_size,
        max_concurrency,
        chunk_timeout: Duration::from_secs(5),
    }
}

pub fn memory_service(chunk_size: usize) -> (Arc<MemoryStore>, FileService) {
    let store = Arc::new(MemoryStore::new());
    let service = FileService::with_store(store.clone(), settings(chunk_size, 4));
    (store, service)
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Chunk store wrapper that fails or stalls selected writes, fails or
/// corrupts selected reads, and records how many operations were in flight
/// at once.
pub struct FaultyChunks {
    inner: Arc<MemoryStore>,
    fail_writes: HashSet<i32>,
    stall_writes: HashSet<i32>,
    fail_reads: HashSet<i32>,
    corrupt_reads: HashSet<i32>,
    delay: Duration,
    reads: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FaultyChunks {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_writes: HashSet::new(),
            stall_writes: HashSet::new(),
            fail_reads: HashSet::new(),
            corrupt_reads: HashSet::new(),
            delay: Duration::ZERO,
            reads: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn failing_writes(mut self, indexes: &[i32]) -> Self {
        self.fail_writes.extend(indexes);
        self
    }

    pub fn stalling_writes(mut self, indexes: &[i32]) -> Self {
        self.stall_writes.extend(indexes);
        self
    }

    pub fn failing_reads(mut self, indexes: &[i32]) -> Self {
        self.fail_reads.extend(indexes);
        self
    }

    /// Flips the first byte of the selected chunks on the way out, leaving
    /// the stored checksum as it was.
    pub fn corrupting_reads(mut self, indexes: &[i32]) -> Self {
        self.corrupt_reads.extend(indexes);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of chunk reads issued so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChunkStore for FaultyChunks {
    async fn put_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        self.enter().await;
        let result = if self.fail_writes.contains(&chunk.chunk_index) {
            Err(StoreError::Unavailable(format!("injected failure for chunk {}", chunk.chunk_index)))
        } else if self.stall_writes.contains(&chunk.chunk_index) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        } else {
            self.inner.put_chunk(chunk).await
        };
        self.leave();
        result
    }

    async fn get_chunk(&self, file_id: Uuid, chunk_index: i32) -> Result<Option<Chunk>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = if self.fail_reads.contains(&chunk_index) {
            Err(StoreError::Unavailable(format!("injected failure for chunk {}", chunk_index)))
        } else if self.corrupt_reads.contains(&chunk_index) {
            self.inner.get_chunk(file_id, chunk_index).await.map(|found| {
                found.map(|mut chunk| {
                    let mut data = chunk.data.to_vec();
                    data[0] ^= 0xff;
                    chunk.data = Bytes::from(data);
                    chunk
                })
            })
        } else {
            self.inner.get_chunk(file_id, chunk_index).await
        };
        self.leave();
        result
    }

    async fn delete_chunks(&self, file_id: Uuid) -> Result<u64, StoreError> {
        self.inner.delete_chunks(file_id).await
    }
}

pub fn faulty_service(chunks: FaultyChunks, store: Arc<MemoryStore>, settings: ChunkSettings) -> (Arc<FaultyChunks>, FileService) {
    let chunks = Arc::new(chunks);
    let service = FileService::new(store, chunks.clone(), settings);
    (chunks, service)
}
