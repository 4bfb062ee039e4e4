use std::fmt::{Debug, Formatter};
use std::io;
use std::path::Path;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Error;

/// Payload of a finished report.
pub enum ReportResponse {
    Buffered(Bytes),
    /// Read once; a second save fails.
    Stream(Option<BoxStream<'static, Result<Bytes, io::Error>>>),
}

impl Debug for ReportResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportResponse::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            ReportResponse::Stream(Some(_)) => f.write_str("Stream"),
            ReportResponse::Stream(None) => f.write_str("Stream(consumed)"),
        }
    }
}

impl From<reqwest::Response> for ReportResponse {
    fn from(response: reqwest::Response) -> Self {
        ReportResponse::Stream(Some(response.bytes_stream().map_err(io::Error::other).boxed()))
    }
}

impl From<Bytes> for ReportResponse {
    fn from(bytes: Bytes) -> Self {
        ReportResponse::Buffered(bytes)
    }
}

impl From<Vec<u8>> for ReportResponse {
    fn from(bytes: Vec<u8>) -> Self {
        ReportResponse::Buffered(bytes.into())
    }
}

impl ReportResponse {
    pub fn from_stream(stream: BoxStream<'static, Result<Bytes, io::Error>>) -> Self {
        ReportResponse::Stream(Some(stream))
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self, ReportResponse::Stream(None))
    }

    async fn write_to<W: AsyncWrite + Unpin>(&mut self, writer: &mut W) -> io::Result<u64> {
        match self {
            ReportResponse::Buffered(bytes) => {
                writer.write_all(bytes).await?;
                Ok(bytes.len() as u64)
            }
            ReportResponse::Stream(stream) => {
                let mut stream = stream
                    .take()
                    .ok_or_else(|| io::Error::other("report stream already consumed"))?;
                let mut written = 0;
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    writer.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                Ok(written)
            }
        }
    }

    /// Writes the payload to `writer`, then shuts it down and drops it, even
    /// when writing failed. The write error wins over the shutdown error.
    async fn write_and_close<W: AsyncWrite + Unpin>(&mut self, mut writer: W) -> io::Result<u64> {
        let written = self.write_to(&mut writer).await;
        let closed = writer.shutdown().await;
        drop(writer);
        let written = written?;
        closed?;
        Ok(written)
    }
}

/// Saves a report payload to the local filesystem.
#[derive(Debug)]
pub struct ReportDownloader {
    response: ReportResponse,
}

impl ReportDownloader {
    /// Fails with [`Error::NullResponse`] when there is no response to save.
    pub fn new(response: Option<ReportResponse>) -> Result<Self, Error> {
        response.map(|response| Self { response }).ok_or(Error::NullResponse)
    }

    pub fn response(&self) -> &ReportResponse {
        &self.response
    }

    /// Writes the whole payload to `path`, replacing any existing file, and
    /// returns the number of bytes written. The file handle is released
    /// before returning on every path.
    pub async fn save(&mut self, path: impl AsRef<Path>) -> Result<u64, Error> {
        let path = path.as_ref();
        if self.response.is_consumed() {
            return Err(Error::Download(io::Error::other("report stream already consumed")));
        }
        let file = File::create(path).await.map_err(Error::Download)?;
        let written = self.response.write_and_close(file).await.map_err(Error::Download)?;
        tracing::debug!(path = %path.display(), written, "report saved");
        Ok(written)
    }
}
