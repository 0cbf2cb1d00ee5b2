use std::io::SeekFrom;

use async_trait::async_trait;
use fsgate_common::error::Result;
use fsgate_common::types::FileInfo;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// A seekable, chunk-readable handle onto one backend object. Dropping
/// the handle releases the underlying backend resource. Implemented for
/// every seekable tokio reader via the blanket impl below.
#[async_trait]
pub trait FileReader: Send {
    async fn seek_to(&mut self, offset: u64) -> std::io::Result<()>;

    /// Read up to `buf.len()` bytes; `Ok(0)` means end of stream.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

#[async_trait]
impl<T: AsyncRead + AsyncSeek + Send + Unpin> FileReader for T {
    async fn seek_to(&mut self, offset: u64) -> std::io::Result<()> {
        AsyncSeekExt::seek(self, SeekFrom::Start(offset)).await.map(|_| ())
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        AsyncReadExt::read(self, buf).await
    }
}

/// Read-side capability of the remote hierarchical store. The gateway
/// only ever stats, lists and reads; connection lifecycle and
/// authentication belong to the implementation.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Metadata snapshot for `path`. `GatewayError::NotFound` when the
    /// node is absent, `BackendUnavailable` on connection-level failure.
    async fn stat(&self, path: &str) -> Result<FileInfo>;

    /// Cheap existence probe, distinct from `stat` so callers can keep
    /// "absent" apart from "stat failed".
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Children of a path already known to be a directory.
    async fn list(&self, path: &str) -> Result<Vec<FileInfo>>;

    /// Open `path` for sequential reads with seek support.
    async fn open(&self, path: &str) -> Result<Box<dyn FileReader>>;
}
