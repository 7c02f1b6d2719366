//! Buffered I/O: the module's staging buffer as a byte stream.
//!
//! The firmware stages outgoing and incoming packet bytes in a bounded
//! buffer. Four commands drive it:
//!
//! | Command | Reply | Meaning |
//! |---------|-------|---------|
//! | `bi-inf` | `<capacity> <count>` (decimal) | buffer size and occupancy |
//! | `bi-wr <HEX>` | `OK` | append bytes |
//! | `bi-rd <n>` | hex blob of `n` bytes | take bytes |
//! | `bi-tx` | `OK` | hand the staged bytes to the radio |
//!
//! Every stream operation asks for a fresh descriptor first (it changes
//! asynchronously as the radio receives) and runs on a single [`Exchange`]
//! so no other command can land between its steps.
//!
//! A write that fails part way is not rolled back: chunks accepted before
//! the failure stay in the module buffer.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::{debug, warn};

use rfmusb_core::error::{Error, Result};
use rfmusb_core::types::BufferedIoInfo;

use crate::codec::{decode_bytes, encode_bytes, parse_decimal};
use crate::command::Command;
use crate::reply;
use crate::session::{Exchange, Session};

/// Largest payload sent in one `bi-wr` command unless configured otherwise.
pub const DEFAULT_MAX_CHUNK: usize = 64;

const CMD_INFO: &str = "bi-inf";
const CMD_WRITE: &str = "bi-wr";
const CMD_READ: &str = "bi-rd";
const CMD_TRANSMIT: &str = "bi-tx";

/// Parse a `bi-inf` reply.
pub fn parse_info(command: &Command, line: &str) -> Result<BufferedIoInfo> {
    if reply::is_error(line) {
        return Err(reply::classify(command, line));
    }

    let mut fields = line.split_whitespace();
    let (Some(capacity), Some(count), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(Error::Protocol(format!(
            "expected '<capacity> <count>', got '{line}'"
        )));
    };
    let capacity: usize = parse_decimal(capacity)?;
    let count: usize = parse_decimal(count)?;
    if count > capacity {
        return Err(Error::Protocol(format!(
            "buffer count {count} exceeds capacity {capacity}"
        )));
    }
    Ok(BufferedIoInfo { capacity, count })
}

/// Query the buffer descriptor.
pub async fn query_info(exchange: &mut Exchange<'_>) -> Result<BufferedIoInfo> {
    let command = Command::new(CMD_INFO);
    let line = exchange.execute(&command).await?;
    parse_info(&command, &line)
}

/// Tell the module to transmit the staged bytes.
pub async fn transmit(exchange: &mut Exchange<'_>) -> Result<()> {
    exchange
        .execute_with_check(&Command::new(CMD_TRANSMIT), reply::OK)
        .await
        .map(|_| ())
}

/// Stage `data` in chunks of at most `max_chunk` bytes, then transmit.
///
/// Fails with [`Error::InsufficientCapacity`] before writing anything if
/// the buffer cannot take all of `data`. An empty `data` performs no
/// transaction.
pub async fn write_buffered(
    exchange: &mut Exchange<'_>,
    data: &[u8],
    max_chunk: usize,
) -> Result<()> {
    if max_chunk == 0 {
        return Err(Error::InvalidParameter("chunk size must be non-zero".into()));
    }
    if data.is_empty() {
        return Ok(());
    }

    let info = query_info(exchange).await?;
    let available = info.available();
    if data.len() > available {
        debug!(requested = data.len(), available, "buffered write does not fit");
        return Err(Error::InsufficientCapacity {
            requested: data.len(),
            available,
        });
    }

    let total = data.len().div_ceil(max_chunk);
    for (index, chunk) in data.chunks(max_chunk).enumerate() {
        let command = Command::new(CMD_WRITE).arg(encode_bytes(chunk));
        if let Err(e) = exchange.execute_with_check(&command, reply::OK).await {
            if index > 0 {
                warn!(
                    written_chunks = index,
                    total_chunks = total,
                    error = %e,
                    "buffered write failed part way, earlier chunks remain staged"
                );
            }
            return Err(e);
        }
    }
    debug!(bytes = data.len(), chunks = total, "buffered write staged");

    transmit(exchange).await
}

/// Take up to `buf.len()` bytes from the buffer.
///
/// Returns the number of bytes copied, zero when the buffer is empty (no
/// read command is issued in that case).
pub async fn read_buffered(exchange: &mut Exchange<'_>, buf: &mut [u8]) -> Result<usize> {
    let info = query_info(exchange).await?;
    let to_read = info.count.min(buf.len());
    if to_read == 0 {
        return Ok(0);
    }

    let command = Command::new(CMD_READ).arg(to_read.to_string());
    let line = exchange.execute(&command).await?;
    if reply::is_error(&line) {
        return Err(reply::classify(&command, &line));
    }
    let data = decode_bytes(&line)?;
    if data.len() != to_read {
        return Err(Error::Protocol(format!(
            "requested {to_read} buffered bytes, received {}",
            data.len()
        )));
    }
    buf[..to_read].copy_from_slice(&data);
    Ok(to_read)
}

type IoFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// The module's staging buffer as a chunked, capacity-aware stream.
///
/// Besides the inherent async methods, the stream implements tokio's
/// [`AsyncRead`] and [`AsyncWrite`]. Each `poll_write` is one complete
/// buffered write followed by a transmit; a read of zero bytes means the
/// buffer is empty right now, not that the stream has ended.
pub struct BufferedStream {
    session: Arc<Session>,
    max_chunk: usize,
    pending_write: Option<IoFuture<usize>>,
    pending_read: Option<IoFuture<Vec<u8>>>,
    leftover: Vec<u8>,
}

impl BufferedStream {
    /// Create a stream with the default chunk size.
    pub fn new(session: Arc<Session>) -> Self {
        BufferedStream {
            session,
            max_chunk: DEFAULT_MAX_CHUNK,
            pending_write: None,
            pending_read: None,
            leftover: Vec::new(),
        }
    }

    /// Use a different chunk size. Zero is rejected.
    pub fn with_max_chunk(mut self, max_chunk: usize) -> Result<Self> {
        if max_chunk == 0 {
            return Err(Error::InvalidParameter("chunk size must be non-zero".into()));
        }
        self.max_chunk = max_chunk;
        Ok(self)
    }

    pub fn max_chunk(&self) -> usize {
        self.max_chunk
    }

    /// Current buffer descriptor.
    pub async fn info(&self) -> Result<BufferedIoInfo> {
        let mut exchange = self.session.exchange().await?;
        query_info(&mut exchange).await
    }

    /// Stage and transmit `data`.
    pub async fn write_data(&self, data: &[u8]) -> Result<()> {
        let mut exchange = self.session.exchange().await?;
        write_buffered(&mut exchange, data, self.max_chunk).await
    }

    /// Take up to `buf.len()` buffered bytes.
    pub async fn read_data(&self, buf: &mut [u8]) -> Result<usize> {
        let mut exchange = self.session.exchange().await?;
        read_buffered(&mut exchange, buf).await
    }
}

async fn write_owned(session: Arc<Session>, data: Vec<u8>, max_chunk: usize) -> Result<usize> {
    let mut exchange = session.exchange().await?;
    write_buffered(&mut exchange, &data, max_chunk).await?;
    Ok(data.len())
}

async fn read_owned(session: Arc<Session>, len: usize) -> Result<Vec<u8>> {
    let mut exchange = session.exchange().await?;
    let mut data = vec![0u8; len];
    let n = read_buffered(&mut exchange, &mut data).await?;
    data.truncate(n);
    Ok(data)
}

fn into_io_error(e: Error) -> io::Error {
    match e {
        Error::Io(inner) => inner,
        Error::Timeout => io::Error::new(io::ErrorKind::TimedOut, e),
        Error::NotOpen | Error::ConnectionLost => io::Error::new(io::ErrorKind::NotConnected, e),
        Error::InvalidParameter(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
        other => io::Error::other(other),
    }
}

impl AsyncRead for BufferedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if !this.leftover.is_empty() {
            let n = this.leftover.len().min(buf.remaining());
            buf.put_slice(&this.leftover[..n]);
            this.leftover.drain(..n);
            return Poll::Ready(Ok(()));
        }
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let len = buf.remaining();
        let session = &this.session;
        let future = this
            .pending_read
            .get_or_insert_with(|| Box::pin(read_owned(Arc::clone(session), len)));
        let result = ready!(future.as_mut().poll(cx));
        this.pending_read = None;

        let data = result.map_err(into_io_error)?;
        let n = data.len().min(buf.remaining());
        buf.put_slice(&data[..n]);
        this.leftover.extend_from_slice(&data[n..]);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for BufferedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let session = &this.session;
        let max_chunk = this.max_chunk;
        let future = this
            .pending_write
            .get_or_insert_with(|| Box::pin(write_owned(Arc::clone(session), buf.to_vec(), max_chunk)));
        let result = ready!(future.as_mut().poll(cx));
        this.pending_write = None;
        Poll::Ready(result.map_err(into_io_error))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
