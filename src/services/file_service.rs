use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::{debug, info, warn};
use metrics::{counter, histogram};
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::chunker::{self, CHUNK_SIZE};
use crate::db::{ChunkStore, MetadataStore};
use crate::error::{Error, Result};
use crate::models::{Chunk, FileRecord};
use crate::services::pool::WorkerPool;
use crate::utils::id::new_file_id;

/// Chunking and fan-out parameters.
#[derive(Debug, Clone)]
pub struct ChunkSettings {
    pub chunk_size: usize,
    pub max_concurrency: usize,
    pub chunk_timeout: Duration,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            max_concurrency: 8,
            chunk_timeout: Duration::from_secs(30),
        }
    }
}

/// A reassembled file.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub record: FileRecord,
    pub data: Bytes,
}

/// Upload, download, listing and deletion of chunked files.
#[derive(Clone)]
pub struct FileService {
    metadata: Arc<dyn MetadataStore>,
    chunks: Arc<dyn ChunkStore>,
    pool: WorkerPool,
    chunk_size: usize,
}

impl FileService {
    pub fn new(metadata: Arc<dyn MetadataStore>, chunks: Arc<dyn ChunkStore>, settings: ChunkSettings) -> Self {
        Self {
            metadata,
            chunks,
            pool: WorkerPool::new(settings.max_concurrency, settings.chunk_timeout),
            chunk_size: settings.chunk_size,
        }
    }

    /// Uses one backing store for both records and chunks.
    pub fn with_store<S>(store: Arc<S>, settings: ChunkSettings) -> Self
    where
        S: MetadataStore + ChunkStore + 'static,
    {
        Self::new(store.clone(), store, settings)
    }

    /// Splits `reader` into chunks and stores them under a fresh id.
    ///
    /// The record is written unpublished before any chunk, and is only marked
    /// ready once every chunk write has been acknowledged. If any write fails
    /// the record and the chunks that did land are removed again, and
    /// [`Error::PartialUpload`] lists the failed indices.
    pub async fn upload<R>(&self, filename: &str, reader: R) -> Result<Uuid>
    where
        R: AsyncRead + Unpin,
    {
        let start_time = Instant::now();
        let filename = validate_filename(filename)?;
        let chunks = chunker::split_stream(reader, self.chunk_size).await?;
        self.store_chunks(filename, chunks, start_time).await
    }

    /// Like [`upload`](Self::upload) for a payload already held in memory.
    pub async fn upload_bytes(&self, filename: &str, data: Bytes) -> Result<Uuid> {
        let start_time = Instant::now();
        let filename = validate_filename(filename)?;
        let chunks = chunker::split_bytes(data, self.chunk_size)?;
        self.store_chunks(filename, chunks, start_time).await
    }

    async fn store_chunks(&self, filename: &str, chunks: Vec<Bytes>, start_time: Instant) -> Result<Uuid> {
        let file_id = new_file_id();
        let total_chunks = i32::try_from(chunks.len())
            .map_err(|_| Error::Input(format!("file has too many chunks ({})", chunks.len())))?;

        let record = FileRecord::new(file_id, filename, total_chunks);
        self.metadata.put_metadata(&record).await?;
        debug!("Stored metadata for {} ({} chunks)", file_id, total_chunks);

        let store = &self.chunks;
        let writes = (0..total_chunks).zip(chunks).map(move |(index, data)| async move {
            store.put_chunk(&Chunk::new(file_id, index, data)).await
        });
        let results = self.pool.run_all(writes).await;

        let mut failed = Vec::new();
        for (index, result) in (0..total_chunks).zip(results) {
            if let Err(e) = result {
                warn!("Error storing chunk {} of {}: {}", index, file_id, e);
                failed.push(index);
            }
        }
        if !failed.is_empty() {
            counter!("chunk_failures_total", "operation" => "upload").increment(failed.len() as u64);
            self.discard(file_id).await;
            return Err(Error::PartialUpload { file_id, failed });
        }

        if let Err(e) = self.metadata.mark_ready(file_id).await {
            self.discard(file_id).await;
            return Err(e.into());
        }

        counter!("files_uploaded_total").increment(1);
        histogram!("request_duration_seconds", "operation" => "upload")
            .record(start_time.elapsed().as_secs_f64());
        info!("Uploaded {} as {} in {} chunks", record.filename, file_id, total_chunks);
        Ok(file_id)
    }

    /// Best-effort removal of an upload that will never be published.
    async fn discard(&self, file_id: Uuid) {
        if let Err(e) = self.chunks.delete_chunks(file_id).await {
            warn!("Error removing chunks of failed upload {}: {}", file_id, e);
        }
        match self.metadata.delete_metadata(file_id).await {
            Ok(_) => debug!("Discarded failed upload {}", file_id),
            Err(e) => warn!("Error removing record of failed upload {}: {}", file_id, e),
        }
    }

    /// Fetches every chunk of `file_id` and concatenates them in index order.
    pub async fn download(&self, file_id: Uuid) -> Result<DownloadedFile> {
        let start_time = Instant::now();
        let record = self
            .metadata
            .get_metadata(file_id)
            .await?
            .ok_or(Error::NotFound(file_id))?;

        if !record.ready {
            warn!("File {} is not ready for download", file_id);
            return Err(Error::IncompleteFile { file_id, missing: Vec::new() });
        }

        let store = &self.chunks;
        let reads = (0..record.total_chunks).map(move |index| async move {
            store.get_chunk(file_id, index).await
        });
        let results = self.pool.run_all(reads).await;

        let mut missing = Vec::new();
        let mut slots = Vec::with_capacity(results.len());
        for (index, result) in (0..record.total_chunks).zip(results) {
            match result {
                Ok(Some(chunk)) if chunk.chunk_index == index && chunk.verify() => slots.push(chunk.data),
                Ok(Some(_)) => {
                    warn!("Chunk {} of {} failed verification", index, file_id);
                    missing.push(index);
                }
                Ok(None) => {
                    warn!("Chunk {} of {} is missing", index, file_id);
                    missing.push(index);
                }
                Err(e) => {
                    warn!("Error retrieving chunk {} of {}: {}", index, file_id, e);
                    missing.push(index);
                }
            }
        }

        if !missing.is_empty() {
            counter!("chunk_failures_total", "operation" => "download").increment(missing.len() as u64);
            return Err(Error::IncompleteFile { file_id, missing });
        }

        let data = chunker::reassemble(slots);

        counter!("files_downloaded_total").increment(1);
        histogram!("request_duration_seconds", "operation" => "download")
            .record(start_time.elapsed().as_secs_f64());
        debug!("Reassembled {} ({} bytes)", file_id, data.len());
        Ok(DownloadedFile { record, data })
    }

    /// Every published record, oldest first.
    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let records = self.metadata.list_metadata().await?;
        Ok(records.into_iter().filter(|r| r.ready).collect())
    }

    /// Removes a record and all of its chunks.
    pub async fn delete_file(&self, file_id: Uuid) -> Result<()> {
        if self.metadata.get_metadata(file_id).await?.is_none() {
            return Err(Error::NotFound(file_id));
        }
        let removed = self.chunks.delete_chunks(file_id).await?;
        if !self.metadata.delete_metadata(file_id).await? {
            return Err(Error::NotFound(file_id));
        }
        info!("Deleted file {} and {} chunks", file_id, removed);
        Ok(())
    }
}

fn validate_filename(filename: &str) -> Result<&str> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(Error::Input("filename is required".to_string()));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(Error::Input("filename contains control characters".to_string()));
    }
    Ok(trimmed)
}
