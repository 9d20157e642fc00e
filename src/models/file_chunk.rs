use bytes::Bytes;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// One fixed-size slice of a stored file, addressed by `(file_id, chunk_index)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub file_id: Uuid,
    pub chunk_index: i32,
    pub data: Bytes,
    pub checksum: String,
}

impl Chunk {
    pub fn new(file_id: Uuid, chunk_index: i32, data: Bytes) -> Self {
        let checksum = checksum(&data);
        Self { file_id, chunk_index, data, checksum }
    }

    /// Recomputes the SHA-256 of `data` and compares it with the stored checksum.
    pub fn verify(&self) -> bool {
        checksum(&self.data) == self.checksum
    }
}

pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
