//! Fixed-size splitting of upload streams and ordered reassembly.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// Size of every chunk except possibly the last one of a file.
pub const CHUNK_SIZE: usize = 1024 * 1024; // 1MB

/// Number of chunks a payload of `len` bytes splits into.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    len.div_ceil(chunk_size)
}

/// Reads `reader` to end-of-stream and cuts it into `chunk_size` pieces.
///
/// Every chunk is exactly `chunk_size` bytes long except a shorter, non-empty
/// final one. Short reads are accumulated, so they never produce short
/// interior chunks. Empty input yields no chunks.
pub async fn split_stream<R>(mut reader: R, chunk_size: usize) -> Result<Vec<Bytes>>
where
    R: AsyncRead + Unpin,
{
    check_chunk_size(chunk_size)?;

    let mut chunks = Vec::new();
    loop {
        let mut buf = BytesMut::zeroed(chunk_size);
        let mut filled = 0;
        while filled < chunk_size {
            let n = reader.read(&mut buf[filled..]).await.map_err(Error::Read)?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            break;
        }
        if filled < chunk_size {
            // the short tail gets its own allocation
            chunks.push(Bytes::copy_from_slice(&buf[..filled]));
            break;
        }
        chunks.push(buf.freeze());
    }
    Ok(chunks)
}

/// Splits an in-memory payload without copying it.
pub fn split_bytes(data: Bytes, chunk_size: usize) -> Result<Vec<Bytes>> {
    check_chunk_size(chunk_size)?;
    let mut chunks = Vec::with_capacity(chunk_count(data.len(), chunk_size));
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + chunk_size).min(data.len());
        chunks.push(data.slice(offset..end));
        offset = end;
    }
    Ok(chunks)
}

/// Concatenates chunks in the order given.
pub fn reassemble<I>(chunks: I) -> Bytes
where
    I: IntoIterator<Item = Bytes>,
{
    let chunks: Vec<Bytes> = chunks.into_iter().collect();
    let total = chunks.iter().map(Bytes::len).sum();
    let mut merged = BytesMut::with_capacity(total);
    for chunk in chunks {
        merged.extend_from_slice(&chunk);
    }
    merged.freeze()
}

fn check_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::Input("chunk size must be positive".to_string()));
    }
    Ok(())
}
