//! Chunked file storage: files are split into fixed-size chunks, written to
//! a backing store through a bounded worker pool, and reassembled in index
//! order on download.

pub mod chunker;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routers;
pub mod services;
pub mod utils;

pub use error::{Error, Result, StoreError};
pub use services::{ChunkSettings, DownloadedFile, FileService};
