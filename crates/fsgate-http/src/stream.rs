use fsgate_backend::traits::{FileReader, RemoteFs};
use fsgate_common::error::GatewayError;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::range::{ByteRange, DeliveryPlan};

/// Copy buffer for backend-to-client transfers.
pub const COPY_BUFFER_SIZE: usize = 2048;

/// MIME multipart separation string, shared by the `Content-Type`
/// parameter and every part delimiter.
pub const MIME_BOUNDARY: &str = "FSGATE_MIME_BOUNDARY";

/// Backend-side failures during a transfer. Client disconnects are not
/// errors; the copy just stops and the bytes already sent stand.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("backend open failed: {0}")]
    Open(#[source] GatewayError),
    #[error("backend read failed: {0}")]
    Read(#[source] std::io::Error),
}

enum CopyEnd {
    Done,
    ClientGone,
}

/// Execute a delivery plan against `sink`. Each range opens its own
/// backend reader, seeks, and copies exactly the span's bytes; readers
/// are dropped on every exit path. `Unsatisfiable` never reaches this
/// function (the orchestrator turns it into a 416 before streaming).
pub async fn stream_plan<W>(
    fs: &dyn RemoteFs,
    path: &str,
    content_type: &str,
    plan: &DeliveryPlan,
    sink: &mut W,
) -> Result<(), StreamError>
where
    W: AsyncWrite + Unpin + Send,
{
    match plan {
        DeliveryPlan::Full => {
            let mut reader = fs.open(path).await.map_err(StreamError::Open)?;
            copy_span(reader.as_mut(), sink, None, path).await?;
        }
        DeliveryPlan::Single(range) => {
            copy_one_range(fs, path, *range, sink).await?;
        }
        DeliveryPlan::Multi(ranges) => {
            for range in ranges {
                let header = format!(
                    "\r\n--{MIME_BOUNDARY}\r\nContent-Type: {content_type}\r\nContent-Range: bytes {}-{}/{}\r\n\r\n",
                    range.start, range.end, range.total
                );
                if sink.write_all(header.as_bytes()).await.is_err() {
                    warn!(path, "client went away during multipart framing");
                    return Ok(());
                }
                if let CopyEnd::ClientGone = copy_one_range(fs, path, *range, sink).await? {
                    return Ok(());
                }
            }
            let trailer = format!("\r\n--{MIME_BOUNDARY}--");
            if sink.write_all(trailer.as_bytes()).await.is_err() {
                return Ok(());
            }
        }
        DeliveryPlan::Unsatisfiable => {}
    }
    let _ = sink.flush().await;
    Ok(())
}

async fn copy_one_range<W>(
    fs: &dyn RemoteFs,
    path: &str,
    range: ByteRange,
    sink: &mut W,
) -> Result<CopyEnd, StreamError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut reader = fs.open(path).await.map_err(StreamError::Open)?;
    reader
        .seek_to(range.start)
        .await
        .map_err(StreamError::Read)?;
    copy_span(reader.as_mut(), sink, Some(range.len()), path).await
}

async fn copy_span<W>(
    reader: &mut dyn FileReader,
    sink: &mut W,
    limit: Option<u64>,
    path: &str,
) -> Result<CopyEnd, StreamError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut buf = [0_u8; COPY_BUFFER_SIZE];
    let mut remaining = limit;

    loop {
        let read = reader.read_chunk(&mut buf).await.map_err(StreamError::Read)?;
        if read == 0 {
            return Ok(CopyEnd::Done);
        }
        let take = match remaining {
            Some(left) => read.min(left as usize),
            None => read,
        };
        if sink.write_all(&buf[..take]).await.is_err() {
            warn!(path, "write aborted, client went away");
            return Ok(CopyEnd::ClientGone);
        }
        if let Some(left) = remaining.as_mut() {
            *left -= take as u64;
            if *left == 0 {
                return Ok(CopyEnd::Done);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::SeekFrom;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use async_trait::async_trait;
    use chrono::Utc;
    use fsgate_backend::MemoryFs;
    use fsgate_common::error::Result as GatewayResult;
    use fsgate_common::types::{FileInfo, PermissionBits, PermissionTriple};
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, ReadBuf};

    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn fs_with_file(data: &[u8]) -> MemoryFs {
        let perms = PermissionTriple::new(
            PermissionBits::All,
            PermissionBits::Read,
            PermissionBits::Read,
        );
        let mut fs = MemoryFs::new();
        fs.add_dir("/", "root", "root", perms, Utc::now())
            .add_file("/data.bin", data.to_vec(), "root", "root", perms, Utc::now());
        fs
    }

    fn range(start: u64, end: u64, total: u64) -> ByteRange {
        ByteRange { start, end, total }
    }

    #[tokio::test]
    async fn full_plan_copies_everything() {
        let data = pattern(5000);
        let fs = fs_with_file(&data);
        let mut sink: Vec<u8> = Vec::new();
        stream_plan(&fs, "/data.bin", "application/octet-stream", &DeliveryPlan::Full, &mut sink)
            .await
            .unwrap();
        assert_eq!(sink, data);
    }

    #[tokio::test]
    async fn single_range_copies_exact_span() {
        let data = pattern(1000);
        let fs = fs_with_file(&data);
        let mut sink: Vec<u8> = Vec::new();
        let plan = DeliveryPlan::Single(range(500, 699, 1000));
        stream_plan(&fs, "/data.bin", "application/octet-stream", &plan, &mut sink)
            .await
            .unwrap();
        assert_eq!(sink, &data[500..=699]);
    }

    #[tokio::test]
    async fn multipart_frames_each_range() {
        let data = pattern(1000);
        let fs = fs_with_file(&data);
        let mut sink: Vec<u8> = Vec::new();
        let plan = DeliveryPlan::Multi(vec![range(0, 99, 1000), range(900, 999, 1000)]);
        stream_plan(&fs, "/data.bin", "text/plain", &plan, &mut sink)
            .await
            .unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(
            b"\r\n--FSGATE_MIME_BOUNDARY\r\nContent-Type: text/plain\r\nContent-Range: bytes 0-99/1000\r\n\r\n",
        );
        expected.extend_from_slice(&data[0..=99]);
        expected.extend_from_slice(
            b"\r\n--FSGATE_MIME_BOUNDARY\r\nContent-Type: text/plain\r\nContent-Range: bytes 900-999/1000\r\n\r\n",
        );
        expected.extend_from_slice(&data[900..=999]);
        expected.extend_from_slice(b"\r\n--FSGATE_MIME_BOUNDARY--");
        assert_eq!(sink, expected);
    }

    #[tokio::test]
    async fn client_disconnect_is_not_an_error() {
        let data = pattern(100_000);
        let fs = fs_with_file(&data);
        let (mut write_half, mut read_half) = tokio::io::duplex(64);

        let reader = tokio::spawn(async move {
            let mut first = [0_u8; 32];
            read_half.read_exact(&mut first).await.unwrap();
            // Hang up mid-transfer.
            drop(read_half);
        });

        stream_plan(
            &fs,
            "/data.bin",
            "application/octet-stream",
            &DeliveryPlan::Full,
            &mut write_half,
        )
        .await
        .unwrap();
        reader.await.unwrap();
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::other("backend read error")))
        }
    }

    impl AsyncSeek for FailingReader {
        fn start_seek(self: Pin<&mut Self>, _position: SeekFrom) -> std::io::Result<()> {
            Ok(())
        }

        fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<u64>> {
            Poll::Ready(Ok(0))
        }
    }

    struct BrokenFs;

    #[async_trait]
    impl RemoteFs for BrokenFs {
        async fn stat(&self, path: &str) -> GatewayResult<FileInfo> {
            Err(GatewayError::NotFound(path.to_string()))
        }

        async fn exists(&self, _path: &str) -> GatewayResult<bool> {
            Ok(true)
        }

        async fn list(&self, path: &str) -> GatewayResult<Vec<FileInfo>> {
            Err(GatewayError::NotFound(path.to_string()))
        }

        async fn open(&self, _path: &str) -> GatewayResult<Box<dyn FileReader>> {
            Ok(Box::new(FailingReader))
        }
    }

    #[tokio::test]
    async fn backend_read_failure_is_reported() {
        let mut sink: Vec<u8> = Vec::new();
        let err = stream_plan(
            &BrokenFs,
            "/data.bin",
            "application/octet-stream",
            &DeliveryPlan::Full,
            &mut sink,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StreamError::Read(_)));
        assert!(sink.is_empty());
    }
}
