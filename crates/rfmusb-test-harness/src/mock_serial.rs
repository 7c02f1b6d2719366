//! Mock transport for deterministic testing of the protocol engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. Each response is a list of chunks. Between two
//! chunks there is a gap: once a chunk has been fully read,
//! [`Transport::bytes_available`] reports zero until the next `receive()`
//! delivers the following chunk. That lets tests model a reply that is
//! emitted back-to-back (one chunk) as well as one with pauses between
//! lines (several chunks).
//!
//! # Example
//!
//! ```
//! use rfmusb_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! mock.expect(b"dv-fv\n", b"1.4.2\n");
//! mock.expect_lines("ir-dio", &["0x01-DIO0", "0x00-DIO1"]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use rfmusb_core::error::{Error, Result};
use rfmusb_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// Response chunks, delivered one after another.
    chunks: Vec<Vec<u8>>,
}

/// A mock [`Transport`] for testing protocol code without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation, whose
/// response chunks then become readable through `receive()`.
///
/// If no expectation matches or the queue is exhausted, `send()` fails
/// with [`Error::Protocol`]. A `receive()` with nothing pending fails with
/// [`Error::Timeout`], as a silent device would.
#[derive(Debug)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    /// Chunks of the current response that have not been fully read.
    pending: VecDeque<Vec<u8>>,
    /// Cursor into the front chunk.
    cursor: usize,
    /// The front chunk is still in flight and not yet visible.
    in_gap: bool,
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
    /// Number of `receive()` calls that found nothing to read.
    timeouts: usize,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending: VecDeque::new(),
            cursor: 0,
            in_gap: false,
            connected: true,
            sent_log: Vec::new(),
            timeouts: 0,
        }
    }

    /// Add an expected request/response pair. The whole response is
    /// readable at once.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        let chunks = if response.is_empty() {
            Vec::new()
        } else {
            vec![response.to_vec()]
        };
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            chunks,
        });
    }

    /// Add an expected request whose response arrives in separate chunks.
    ///
    /// Each chunk after the first stays invisible to `bytes_available()`
    /// until a `receive()` call picks it up.
    pub fn expect_chunked(&mut self, request: &[u8], chunks: &[&[u8]]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
        });
    }

    /// Line-oriented convenience: `command` is sent with a trailing `\n`
    /// and every reply line is returned newline-terminated, back-to-back.
    pub fn expect_lines(&mut self, command: &str, lines: &[&str]) {
        let mut response = Vec::new();
        for line in lines {
            response.extend_from_slice(line.as_bytes());
            response.push(b'\n');
        }
        self.expect(format!("{command}\n").as_bytes(), &response);
    }

    /// Line-oriented convenience for a single reply line.
    pub fn expect_reply(&mut self, command: &str, reply: &str) {
        self.expect_lines(command, &[reply]);
    }

    /// Return a reference to all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Sent data decoded as text with the line terminator stripped.
    pub fn sent_lines(&self) -> Vec<String> {
        self.sent_log
            .iter()
            .map(|d| String::from_utf8_lossy(d).trim_end_matches('\n').to_string())
            .collect()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Number of `receive()` calls that timed out because nothing was pending.
    pub fn timeouts(&self) -> usize {
        self.timeouts
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent calls return [`Error::NotOpen`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotOpen);
        }

        self.sent_log.push(data.to_vec());

        if let Some(expectation) = self.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(Error::Protocol(format!(
                    "unexpected send data: expected {:?}, got {:?}",
                    String::from_utf8_lossy(&expectation.request),
                    String::from_utf8_lossy(data)
                )));
            }
            self.pending = expectation.chunks.into();
            self.cursor = 0;
            self.in_gap = false;
            Ok(())
        } else {
            Err(Error::Protocol(
                "no more expectations in mock transport".into(),
            ))
        }
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotOpen);
        }

        let Some(chunk) = self.pending.front() else {
            self.timeouts += 1;
            return Err(Error::Timeout);
        };

        let remaining = &chunk[self.cursor..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.cursor += n;
        self.in_gap = false;
        if self.cursor >= chunk.len() {
            self.pending.pop_front();
            self.cursor = 0;
            self.in_gap = !self.pending.is_empty();
        }
        Ok(n)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotOpen);
        }
        if self.in_gap {
            return Ok(0);
        }
        Ok(self
            .pending
            .front()
            .map(|chunk| chunk.len() - self.cursor)
            .unwrap_or(0))
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending.clear();
        self.cursor = 0;
        self.in_gap = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
