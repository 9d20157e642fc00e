pub mod file_service;
pub mod pool;

pub use file_service::{ChunkSettings, DownloadedFile, FileService};
pub use pool::WorkerPool;
