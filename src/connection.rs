// ABOUTME: Owns the byte stream to the modem: a serial port in production, any async stream in tests
// ABOUTME: Buffers writes and accumulates response bytes for the command session to match against

use crate::client::SerialSettings;
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_serial::SerialPortBuilderExt;
use tracing::debug;

/// Anything the modem can be reached through
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// A byte channel to the modem.
///
/// AT traffic has no framing beyond line endings and final result codes, so
/// the connection only accumulates what arrives; deciding when a response is
/// complete is up to the caller.
pub struct Connection {
    // Writes are buffered and flushed once per payload.
    stream: BufWriter<Box<dyn Transport>>,

    // Bytes received since the last `discard_pending` or `take_buffered`.
    buffer: BytesMut,
}

impl Connection {
    /// Wrap an already-open stream
    pub fn new<T>(stream: T) -> Connection
    where
        T: Transport + 'static,
    {
        Connection {
            stream: BufWriter::new(Box::new(stream)),
            // listings of a full SIM run to a few KB
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Open the serial device described by `settings`
    pub fn open(settings: &SerialSettings) -> io::Result<Connection> {
        let port = tokio_serial::new(settings.path.as_str(), settings.baud_rate)
            .timeout(settings.timeout)
            .open_native_async()
            .map_err(io::Error::from)?;
        debug!("Opened {} at {} baud", settings.path, settings.baud_rate);
        Ok(Connection::new(port))
    }

    /// Write a payload verbatim and flush it to the device
    pub async fn write_payload(&mut self, payload: &[u8]) -> io::Result<()> {
        self.stream.write_all(payload).await?;
        self.stream.flush().await
    }

    /// Read whatever the device has sent into the buffer.
    ///
    /// Returns the number of bytes read; `0` means the stream has ended.
    pub async fn read_more(&mut self) -> io::Result<usize> {
        self.stream.read_buf(&mut self.buffer).await
    }

    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Hand over the accumulated bytes, leaving the buffer empty
    pub fn take_buffered(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Drop buffered bytes and anything already waiting on the stream, such
    /// as a late answer to a command that timed out or an unsolicited result.
    pub async fn discard_pending(&mut self) -> io::Result<usize> {
        let mut discarded = self.buffer.len();
        self.buffer.clear();

        // A zero timeout still polls the read once, so only data that is
        // already available is consumed.
        while let Ok(read) =
            tokio::time::timeout(Duration::ZERO, self.stream.read_buf(&mut self.buffer)).await
        {
            let read = read?;
            if read == 0 {
                break;
            }
            discarded += read;
            self.buffer.clear();
        }

        if discarded > 0 {
            debug!("Discarded {} stale bytes", discarded);
        }
        Ok(discarded)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_write_payload_is_flushed() {
        let (client, mut modem) = duplex(64);
        let mut connection = Connection::new(client);
        connection.write_payload(b"AT\r").await.unwrap();

        let mut received = [0u8; 3];
        modem.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"AT\r");
    }

    #[tokio::test]
    async fn test_read_accumulates_until_taken() {
        let (client, mut modem) = duplex(64);
        let mut connection = Connection::new(client);

        modem.write_all(b"\r\nO").await.unwrap();
        connection.read_more().await.unwrap();
        modem.write_all(b"K\r\n").await.unwrap();
        while connection.buffered().len() < 6 {
            connection.read_more().await.unwrap();
        }
        assert_eq!(connection.take_buffered(), Bytes::from_static(b"\r\nOK\r\n"));
        assert!(connection.buffered().is_empty());
    }

    #[tokio::test]
    async fn test_end_of_stream_reads_zero() {
        let (client, modem) = duplex(64);
        let mut connection = Connection::new(client);
        drop(modem);
        assert_eq!(connection.read_more().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_discard_pending_drops_stale_bytes() {
        let (client, mut modem) = duplex(64);
        let mut connection = Connection::new(client);

        modem.write_all(b"\r\n+CMTI: \"SM\",3\r\n").await.unwrap();
        let discarded = connection.discard_pending().await.unwrap();
        assert_eq!(discarded, 17);
        assert!(connection.buffered().is_empty());

        // nothing pending returns immediately
        assert_eq!(connection.discard_pending().await.unwrap(), 0);
    }
}
