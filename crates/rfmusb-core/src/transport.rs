//! Transport trait for communicating with the USB serial bridge.
//!
//! The [`Transport`] trait abstracts over the physical link to the module.
//! `rfmusb-transport` provides the serial implementation and
//! `rfmusb-test-harness` a scripted mock, so the protocol engine in
//! `rfmusb-protocol` can be exercised without hardware.
//!
//! The trait is byte-oriented. Line reassembly and reply
//! framing belong to the protocol engine, which keeps its own buffer and
//! combines it with [`Transport::bytes_available`] when it needs to know
//! whether more of a reply is already waiting.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to the bridge.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the bridge.
    ///
    /// Implementations should not return until all bytes have been handed
    /// to the underlying port.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing arrives within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Number of received bytes that can be read right now without waiting.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotOpen`](crate::error::Error::NotOpen).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
