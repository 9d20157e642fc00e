pub mod file;
pub mod file_chunk;

pub use file::FileRecord;
pub use file_chunk::Chunk;
