//! Module `channel`
//!
//! Framed duplex channel carrying the poll protocol over a byte stream.
//!
//! Ints are 4-byte big-endian; strings are an int byte length followed by
//! that many UTF-8 bytes. Writes are buffered until `flush`.

use log::{debug, warn};
use std::io;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
    ReadHalf, WriteHalf,
};

/// Upper bound on an inbound string frame.
const MAX_STRING_LENGTH: usize = 64 * 1024;

/// Framed reader/writer pair over any tokio stream.
pub struct FramedChannel<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: BufWriter<WriteHalf<S>>,
}

impl<S> FramedChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        }
    }

    /// Blocks until a full int has arrived.
    pub async fn read_int(&mut self) -> io::Result<i32> {
        self.reader.read_i32().await
    }

    /// Blocks until a full length-prefixed string has arrived.
    pub async fn read_string(&mut self) -> io::Result<String> {
        let len = self.read_int().await?;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= MAX_STRING_LENGTH)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid string length {}", len),
                )
            })?;

        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).await?;
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub async fn write_int(&mut self, value: i32) -> io::Result<()> {
        self.writer.write_i32(value).await
    }

    pub async fn write_string(&mut self, value: &str) -> io::Result<()> {
        let len = i32::try_from(value.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "string too long for frame")
        })?;
        self.writer.write_i32(len).await?;
        self.writer.write_all(value.as_bytes()).await
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }

    /// Non-blocking check for inbound bytes.
    ///
    /// An orderly EOF is reported as `UnexpectedEof`: the peer vanished
    /// without a disconnect request.
    pub async fn available(&mut self) -> io::Result<bool> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }

        // A zero timeout polls the read exactly once.
        match tokio::time::timeout(Duration::ZERO, self.reader.fill_buf()).await {
            Ok(Ok(buf)) if buf.is_empty() => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed the connection",
            )),
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(false),
        }
    }

    /// Flushes pending output, shuts down the write side and releases the
    /// stream. Each step is attempted even if an earlier one failed.
    pub async fn close(self) {
        let FramedChannel { reader, mut writer } = self;

        if let Err(e) = writer.flush().await {
            warn!("Failed to flush channel on close: {}", e);
        }
        if let Err(e) = writer.shutdown().await {
            warn!("Failed to shut down write side: {}", e);
        }

        drop(reader.into_inner());
        drop(writer.into_inner());
        debug!("Channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_int_and_string_framing() {
        let (a, b) = tokio::io::duplex(256);
        let mut server = FramedChannel::new(a);
        let mut client = FramedChannel::new(b);

        server.write_int(42).await.unwrap();
        server.write_string("Zufall").await.unwrap();
        server.write_int(-1).await.unwrap();
        server.flush().await.unwrap();

        assert_eq!(client.read_int().await.unwrap(), 42);
        assert_eq!(client.read_string().await.unwrap(), "Zufall");
        assert_eq!(client.read_int().await.unwrap(), -1);
    }

    #[tokio::test]
    async fn test_wire_layout_is_big_endian() {
        let (a, mut b) = tokio::io::duplex(64);
        let mut server = FramedChannel::new(a);

        server.write_int(1).await.unwrap();
        server.write_string("ab").await.unwrap();
        server.flush().await.unwrap();

        let mut raw = [0u8; 10];
        b.read_exact(&mut raw).await.unwrap();
        assert_eq!(raw, [0, 0, 0, 1, 0, 0, 0, 2, b'a', b'b']);
    }

    #[tokio::test]
    async fn test_writes_are_buffered_until_flush() {
        let (a, b) = tokio::io::duplex(64);
        let mut server = FramedChannel::new(a);
        let mut client = FramedChannel::new(b);

        server.write_int(7).await.unwrap();
        assert!(!client.available().await.unwrap());

        server.flush().await.unwrap();
        assert!(client.available().await.unwrap());
        assert_eq!(client.read_int().await.unwrap(), 7);
        assert!(!client.available().await.unwrap());
    }

    #[tokio::test]
    async fn test_available_reports_eof_as_error() {
        let (a, b) = tokio::io::duplex(64);
        let mut server = FramedChannel::new(a);
        drop(b);

        let err = server.available().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_negative_string_length_is_rejected() {
        let (a, b) = tokio::io::duplex(64);
        let mut server = FramedChannel::new(a);
        let mut client = FramedChannel::new(b);

        server.write_int(-5).await.unwrap();
        server.flush().await.unwrap();

        let err = client.read_string().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_close_signals_eof_to_peer() {
        let (a, b) = tokio::io::duplex(64);
        let mut server = FramedChannel::new(a);
        let mut client = FramedChannel::new(b);

        server.write_int(3).await.unwrap();
        server.close().await;

        assert_eq!(client.read_int().await.unwrap(), 3);
        let err = client.read_int().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
