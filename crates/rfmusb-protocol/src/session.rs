//! Transaction engine.
//!
//! A [`Session`] owns the transport to one bridge, the line reassembly
//! buffer, and the session-wide read/write timeouts, all behind a single
//! async mutex. Every public operation is one awaited call that runs one or
//! more request/response exchanges in program order; nothing is pipelined
//! and nothing is retried.
//!
//! Multi-line protocols (flag sequences, buffered I/O, list draining) must
//! not let another task slip a command in between their lines, so they run
//! on an [`Exchange`]: a guard that holds the session lock for as long as it
//! lives.
//!
//! How many lines make up a reply is decided in exactly one place, the
//! [`Framing`] passed to [`Exchange::read_framed`]. The protocol has no
//! length prefix or end marker, so two of the framings are heuristics:
//! [`Framing::WhileBuffered`] and [`Framing::UntilTimeout`].

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use rfmusb_core::error::{Error, Result};
use rfmusb_core::transport::Transport;

use crate::command::{Command, LINE_TERMINATOR};
use crate::reply;

/// Upper bound on a single reply line. Longer input is treated as noise.
const MAX_LINE: usize = 8192;

/// Size of one transport read.
const RECV_CHUNK: usize = 256;

/// Session-wide settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a line read may wait for the device.
    pub read_timeout: Duration,
    /// How long a command write may take.
    pub write_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            read_timeout: Duration::from_millis(500),
            write_timeout: Duration::from_millis(500),
        }
    }
}

/// How many reply lines belong to one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Exactly one line.
    Single,
    /// Exactly `n` lines. A line carrying an error token ends the
    /// reply early.
    Fixed(usize),
    /// At least one line, then more for as long as bytes are already
    /// waiting when a line has been read.
    ///
    /// Relies on the firmware emitting the whole reply back-to-back; a gap
    /// between lines longer than the host's read latency truncates the
    /// reply.
    WhileBuffered,
    /// Lines until a read times out. Returns whatever was collected,
    /// possibly nothing. Always costs one full read timeout.
    UntilTimeout,
}

struct Link {
    transport: Option<Box<dyn Transport>>,
    rx_buf: Vec<u8>,
    read_timeout: Duration,
    write_timeout: Duration,
}

/// One open (or openable) connection to a bridge.
pub struct Session {
    link: Mutex<Link>,
}

impl Session {
    /// Create a closed session.
    pub fn new(config: SessionConfig) -> Self {
        Session {
            link: Mutex::new(Link {
                transport: None,
                rx_buf: Vec::new(),
                read_timeout: config.read_timeout,
                write_timeout: config.write_timeout,
            }),
        }
    }

    /// Create a session that is already open on `transport`.
    pub fn with_transport(transport: Box<dyn Transport>, config: SessionConfig) -> Self {
        Session {
            link: Mutex::new(Link {
                transport: Some(transport),
                rx_buf: Vec::new(),
                read_timeout: config.read_timeout,
                write_timeout: config.write_timeout,
            }),
        }
    }

    /// Open the named serial port.
    pub async fn open(&self, port: &str, baud_rate: u32) -> Result<()> {
        if self.is_open().await {
            return Err(Error::InvalidParameter("session is already open".into()));
        }
        let transport = rfmusb_transport::SerialTransport::open(port, baud_rate).await?;
        self.open_with_transport(Box::new(transport)).await
    }

    /// Open the session on a caller-provided transport (mock or custom).
    ///
    /// Fails with [`Error::InvalidParameter`] if the session is already open.
    pub async fn open_with_transport(&self, transport: Box<dyn Transport>) -> Result<()> {
        let mut link = self.link.lock().await;
        if link.transport.is_some() {
            return Err(Error::InvalidParameter("session is already open".into()));
        }
        link.rx_buf.clear();
        link.transport = Some(transport);
        debug!("session opened");
        Ok(())
    }

    /// Close the transport. Closing a closed session is a no-op.
    ///
    /// Waits for any exchange in progress to finish first.
    pub async fn close(&self) -> Result<()> {
        let mut link = self.link.lock().await;
        link.rx_buf.clear();
        if let Some(mut transport) = link.transport.take() {
            transport.close().await?;
            debug!("session closed");
        }
        Ok(())
    }

    /// Close the session and release it.
    pub async fn dispose(self) -> Result<()> {
        self.close().await
    }

    /// Whether the session currently has an open transport.
    pub async fn is_open(&self) -> bool {
        self.link
            .lock()
            .await
            .transport
            .as_ref()
            .is_some_and(|t| t.is_connected())
    }

    /// Current read timeout.
    pub async fn read_timeout(&self) -> Duration {
        self.link.lock().await.read_timeout
    }

    /// Change the read timeout; applies to the next transport read.
    pub async fn set_read_timeout(&self, timeout: Duration) {
        self.link.lock().await.read_timeout = timeout;
    }

    /// Current write timeout.
    pub async fn write_timeout(&self) -> Duration {
        self.link.lock().await.write_timeout
    }

    /// Change the write timeout; applies to the next transport write.
    pub async fn set_write_timeout(&self, timeout: Duration) {
        self.link.lock().await.write_timeout = timeout;
    }

    /// Take exclusive use of the transport for a multi-step exchange.
    pub async fn exchange(&self) -> Result<Exchange<'_>> {
        let link = self.link.lock().await;
        if link.transport.is_none() {
            return Err(Error::NotOpen);
        }
        Ok(Exchange { link })
    }

    /// Send one command and return its single reply line.
    pub async fn execute(&self, command: &Command) -> Result<String> {
        self.exchange().await?.execute(command).await
    }

    /// Send one command and require its reply to start with `expected`.
    pub async fn execute_with_check(&self, command: &Command, expected: &str) -> Result<String> {
        self.exchange()
            .await?
            .execute_with_check(command, expected)
            .await
    }

    /// Send one command and read exactly `count` reply lines.
    pub async fn execute_lines(&self, command: &Command, count: usize) -> Result<Vec<String>> {
        self.exchange()
            .await?
            .execute_framed(command, Framing::Fixed(count))
            .await
    }

    /// Send one command and collect reply lines until the device goes quiet.
    pub async fn execute_list(&self, command: &Command) -> Result<Vec<String>> {
        self.exchange()
            .await?
            .execute_framed(command, Framing::UntilTimeout)
            .await
    }
}

/// Exclusive hold on a session's transport.
///
/// Obtained from [`Session::exchange`]; the session lock is released when
/// the exchange is dropped.
pub struct Exchange<'a> {
    link: MutexGuard<'a, Link>,
}

impl Exchange<'_> {
    /// Write one command line.
    ///
    /// Input left over from an earlier exchange (a reply that arrived after
    /// its read timed out) is discarded first so it cannot be mistaken for
    /// this command's reply.
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        self.discard_stale().await?;

        let link = &mut *self.link;
        let timeout = link.write_timeout;
        let transport = link.transport.as_mut().ok_or(Error::NotOpen)?;

        debug!(command = %command, "sending command");
        let bytes = command.to_wire();
        match tokio::time::timeout(timeout, transport.send(&bytes)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(command = %command, timeout_ms = timeout.as_millis(), "write timed out");
                Err(Error::Timeout)
            }
        }
    }

    /// Read one reply line, without its terminator.
    ///
    /// Waits at most the session read timeout for the complete line.
    pub async fn read_line(&mut self) -> Result<String> {
        let link = &mut *self.link;
        let deadline = tokio::time::Instant::now() + link.read_timeout;
        let transport = link.transport.as_mut().ok_or(Error::NotOpen)?;

        loop {
            if let Some(pos) = link.rx_buf.iter().position(|&b| b == LINE_TERMINATOR) {
                let raw: Vec<u8> = link.rx_buf.drain(..=pos).collect();
                return decode_line(&raw[..pos]);
            }

            if link.rx_buf.len() > MAX_LINE {
                warn!(len = link.rx_buf.len(), "reply line too long, discarding input");
                link.rx_buf.clear();
                return Err(Error::Protocol("reply line exceeds maximum length".into()));
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }

            let mut chunk = [0u8; RECV_CHUNK];
            let n = transport.receive(&mut chunk, remaining).await?;
            link.rx_buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Bytes that can be read right now: reassembly buffer plus whatever
    /// the transport already holds.
    pub fn bytes_available(&mut self) -> Result<usize> {
        let link = &mut *self.link;
        let transport = link.transport.as_mut().ok_or(Error::NotOpen)?;
        Ok(link.rx_buf.len() + transport.bytes_available()?)
    }

    /// Read the lines of one reply according to `framing`.
    pub async fn read_framed(&mut self, framing: Framing) -> Result<Vec<String>> {
        match framing {
            Framing::Single => Ok(vec![self.read_line().await?]),
            Framing::Fixed(count) => {
                let mut lines = Vec::with_capacity(count);
                for _ in 0..count {
                    let line = self.read_line().await?;
                    let is_error = reply::is_error(&line);
                    lines.push(line);
                    if is_error {
                        break;
                    }
                }
                Ok(lines)
            }
            Framing::WhileBuffered => {
                let mut lines = vec![self.read_line().await?];
                while self.bytes_available()? > 0 {
                    lines.push(self.read_line().await?);
                }
                trace!(lines = lines.len(), "buffered reply complete");
                Ok(lines)
            }
            Framing::UntilTimeout => {
                let mut lines = Vec::new();
                loop {
                    match self.read_line().await {
                        Ok(line) => lines.push(line),
                        Err(Error::Timeout) if !self.link.rx_buf.is_empty() => {
                            let partial = String::from_utf8_lossy(&self.link.rx_buf).into_owned();
                            self.link.rx_buf.clear();
                            return Err(Error::Protocol(format!(
                                "list reply ended mid-line after {} lines: {partial:?}",
                                lines.len()
                            )));
                        }
                        Err(Error::Timeout) => break,
                        Err(e) => return Err(e),
                    }
                }
                trace!(lines = lines.len(), "list reply drained");
                Ok(lines)
            }
        }
    }

    /// Send `command` and return its single reply line.
    pub async fn execute(&mut self, command: &Command) -> Result<String> {
        self.send(command).await?;
        self.read_line().await
    }

    /// Send `command` and require the reply to start with `expected`.
    pub async fn execute_with_check(&mut self, command: &Command, expected: &str) -> Result<String> {
        let line = self.execute(command).await?;
        reply::check(command, &line, expected)?;
        Ok(line)
    }

    /// Send `command` and read its reply according to `framing`.
    pub async fn execute_framed(
        &mut self,
        command: &Command,
        framing: Framing,
    ) -> Result<Vec<String>> {
        self.send(command).await?;
        self.read_framed(framing).await
    }

    async fn discard_stale(&mut self) -> Result<()> {
        let link = &mut *self.link;
        let transport = link.transport.as_mut().ok_or(Error::NotOpen)?;

        let mut discarded = std::mem::take(&mut link.rx_buf).len();
        let mut chunk = [0u8; RECV_CHUNK];
        while transport.bytes_available()? > 0 {
            match transport.receive(&mut chunk, Duration::ZERO).await {
                Ok(0) | Err(Error::Timeout) => break,
                Ok(n) => discarded += n,
                Err(e) => return Err(e),
            }
        }

        if discarded > 0 {
            warn!(bytes = discarded, "discarding stale input before command");
        }
        Ok(())
    }
}

fn decode_line(raw: &[u8]) -> Result<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = std::str::from_utf8(raw)
        .map_err(|_| Error::Protocol(format!("reply is not valid text: {raw:02X?}")))?;
    trace!(reply = line, "received line");
    Ok(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfmusb_test_harness::MockTransport;

    fn open_session(mock: MockTransport) -> Session {
        Session::with_transport(Box::new(mock), SessionConfig::default())
    }

    #[tokio::test]
    async fn execute_returns_reply_line() {
        let mut mock = MockTransport::new();
        mock.expect_reply("dv-fv", "1.4.2");
        let session = open_session(mock);

        let reply = session.execute(&Command::new("dv-fv")).await.unwrap();
        assert_eq!(reply, "1.4.2");
    }

    #[tokio::test]
    async fn execute_strips_carriage_return() {
        let mut mock = MockTransport::new();
        mock.expect(b"dv-sn\n", b"A1B2C3\r\n");
        let session = open_session(mock);

        let reply = session.execute(&Command::new("dv-sn")).await.unwrap();
        assert_eq!(reply, "A1B2C3");
    }

    #[tokio::test]
    async fn execute_reassembles_split_line() {
        let mut mock = MockTransport::new();
        mock.expect_chunked(b"rf-frq\n", &[b"0xE4", b"C000\n"]);
        let session = open_session(mock);

        let reply = session.execute(&Command::new("rf-frq")).await.unwrap();
        assert_eq!(reply, "0xE4C000");
    }

    #[tokio::test]
    async fn closed_session_is_not_open() {
        let session = Session::new(SessionConfig::default());
        assert!(!session.is_open().await);
        let result = session.execute(&Command::new("dv-fv")).await;
        assert!(matches!(result, Err(Error::NotOpen)));
    }

    #[tokio::test]
    async fn check_accepts_ok() {
        let mut mock = MockTransport::new();
        mock.expect_reply("rf-frq 0xE4C000", "OK");
        let session = open_session(mock);

        let cmd = Command::new("rf-frq").arg("0xE4C000");
        assert!(session.execute_with_check(&cmd, reply::OK).await.is_ok());
    }

    #[tokio::test]
    async fn check_classifies_overflow() {
        let mut mock = MockTransport::new();
        mock.expect_reply("bi-wr AA", "ERROR:OVERFLOW");
        let session = open_session(mock);

        let cmd = Command::new("bi-wr").arg("AA");
        let result = session.execute_with_check(&cmd, reply::OK).await;
        assert!(matches!(result, Err(Error::BufferOverflow)));
    }

    #[tokio::test]
    async fn check_unrecognized_reply_fails_with_context() {
        let mut mock = MockTransport::new();
        mock.expect_reply("rf-mod 0x1", "huh");
        let session = open_session(mock);

        let cmd = Command::new("rf-mod").arg("0x1");
        match session.execute_with_check(&cmd, reply::OK).await {
            Err(Error::CommandExecutionFailed { command, reply }) => {
                assert_eq!(command, "rf-mod 0x1");
                assert_eq!(reply, "huh");
            }
            other => panic!("expected CommandExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_device_times_out() {
        let mut mock = MockTransport::new();
        mock.expect(b"dv-fv\n", b"");
        let session = open_session(mock);

        let result = session.execute(&Command::new("dv-fv")).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn fixed_count_reads_exactly_n_lines() {
        let mut mock = MockTransport::new();
        mock.expect_lines("ir-dio", &["a", "b", "c"]);
        let session = open_session(mock);

        let lines = session
            .execute_lines(&Command::new("ir-dio"), 2)
            .await
            .unwrap();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn fixed_count_stops_at_error_line() {
        let mut mock = MockTransport::new();
        mock.expect_lines("lr-mst", &["ERROR:NOT_LORA"]);
        let session = open_session(mock);

        let lines = session
            .execute_lines(&Command::new("lr-mst"), 5)
            .await
            .unwrap();
        assert_eq!(lines, vec!["ERROR:NOT_LORA"]);
    }

    #[tokio::test]
    async fn fixed_count_stops_at_later_error_line() {
        let mut mock = MockTransport::new();
        mock.expect_lines("ir-dio", &["0x01-DIO0", "ERROR:OVERFLOW"]);
        let session = Session::with_transport(
            Box::new(mock),
            SessionConfig {
                read_timeout: Duration::from_millis(50),
                ..SessionConfig::default()
            },
        );

        let lines = session
            .execute_lines(&Command::new("ir-dio"), 6)
            .await
            .unwrap();
        assert_eq!(lines, vec!["0x01-DIO0", "ERROR:OVERFLOW"]);
    }

    #[tokio::test]
    async fn fixed_count_short_reply_times_out() {
        let mut mock = MockTransport::new();
        mock.expect_lines("ir-dio", &["0x1-DIO0"]);
        let session = open_session(mock);

        let result = session.execute_lines(&Command::new("ir-dio"), 6).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn list_drains_until_timeout() {
        let mut mock = MockTransport::new();
        mock.expect_lines("dv-dmp", &["0x01=0x04", "0x02=0x00"]);
        let session = open_session(mock);

        let lines = session.execute_list(&Command::new("dv-dmp")).await.unwrap();
        assert_eq!(lines, vec!["0x01=0x04", "0x02=0x00"]);
    }

    #[tokio::test]
    async fn list_ending_mid_line_is_protocol_error() {
        let mut mock = MockTransport::new();
        mock.expect(b"dv-dmp\n", b"0x01=0x04\n0x02=0x0");
        mock.expect_reply("dv-fv", "1.4.2");
        let session = open_session(mock);

        let result = session.execute_list(&Command::new("dv-dmp")).await;
        match result {
            Err(Error::Protocol(msg)) => assert!(msg.contains("0x02=0x0"), "{msg}"),
            other => panic!("expected Protocol, got {other:?}"),
        }

        // The fragment does not leak into the next reply.
        let next = session.execute(&Command::new("dv-fv")).await.unwrap();
        assert_eq!(next, "1.4.2");
    }

    #[tokio::test]
    async fn list_may_be_empty() {
        let mut mock = MockTransport::new();
        mock.expect(b"dv-dmp\n", b"");
        let session = open_session(mock);

        let lines = session.execute_list(&Command::new("dv-dmp")).await.unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn while_buffered_stops_at_boundary() {
        let mut mock = MockTransport::new();
        mock.expect_lines("ir-flg", &["1:CRC_OK", "0:FIFO_FULL"]);
        mock.expect_reply("dv-fv", "1.4.2");
        let session = open_session(mock);

        let mut exchange = session.exchange().await.unwrap();
        let lines = exchange
            .execute_framed(&Command::new("ir-flg"), Framing::WhileBuffered)
            .await
            .unwrap();
        assert_eq!(lines, vec!["1:CRC_OK", "0:FIFO_FULL"]);

        // The next transaction sees its own reply, nothing left over.
        let next = exchange.execute(&Command::new("dv-fv")).await.unwrap();
        assert_eq!(next, "1.4.2");
    }

    #[tokio::test]
    async fn while_buffered_truncates_on_inter_line_gap() {
        let mut mock = MockTransport::new();
        mock.expect_chunked(b"ir-flg\n", &[b"1:CRC_OK\n", b"1:PAYLOAD_READY\n"]);
        let session = open_session(mock);

        let lines = session
            .exchange()
            .await
            .unwrap()
            .execute_framed(&Command::new("ir-flg"), Framing::WhileBuffered)
            .await
            .unwrap();
        assert_eq!(lines, vec!["1:CRC_OK"]);
    }

    #[tokio::test]
    async fn late_reply_is_discarded_before_next_command() {
        let mut mock = MockTransport::new();
        // Two lines arrive for a command that expected one; the extra line
        // must not be read as the next command's reply.
        mock.expect_lines("rf-frq", &["0xE4C000", "junk"]);
        mock.expect_reply("dv-fv", "1.4.2");
        let session = open_session(mock);

        assert_eq!(
            session.execute(&Command::new("rf-frq")).await.unwrap(),
            "0xE4C000"
        );
        assert_eq!(
            session.execute(&Command::new("dv-fv")).await.unwrap(),
            "1.4.2"
        );
    }

    #[tokio::test]
    async fn overlong_line_is_protocol_error() {
        let mut mock = MockTransport::new();
        let garbage = vec![b'A'; MAX_LINE + RECV_CHUNK + 1];
        mock.expect(b"dv-fv\n", &garbage);
        let session = open_session(mock);

        let result = session.execute(&Command::new("dv-fv")).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn non_text_reply_is_protocol_error() {
        let mut mock = MockTransport::new();
        mock.expect(b"dv-fv\n", &[0xFF, 0xFE, b'\n']);
        let session = open_session(mock);

        let result = session.execute(&Command::new("dv-fv")).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn timeouts_are_session_wide_settings() {
        let session = Session::new(SessionConfig::default());
        assert_eq!(session.read_timeout().await, Duration::from_millis(500));

        session.set_read_timeout(Duration::from_millis(50)).await;
        session.set_write_timeout(Duration::from_millis(75)).await;
        assert_eq!(session.read_timeout().await, Duration::from_millis(50));
        assert_eq!(session.write_timeout().await, Duration::from_millis(75));
    }

    #[tokio::test]
    async fn open_close_lifecycle() {
        let session = Session::new(SessionConfig::default());
        session
            .open_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();
        assert!(session.is_open().await);

        let again = session
            .open_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(again, Err(Error::InvalidParameter(_))));

        session.close().await.unwrap();
        assert!(!session.is_open().await);
        // Closing twice is harmless.
        session.close().await.unwrap();

        session
            .open_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();
        session.dispose().await.unwrap();
    }

    #[tokio::test]
    async fn open_on_open_session_is_rejected_before_touching_the_port() {
        let session = open_session(MockTransport::new());
        let result = session.open("/dev/rfmusb-no-such-port", 115_200).await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        assert!(session.is_open().await);
    }

    #[tokio::test]
    async fn exchange_requires_open_session() {
        let session = Session::new(SessionConfig::default());
        assert!(matches!(session.exchange().await, Err(Error::NotOpen)));
    }
}
