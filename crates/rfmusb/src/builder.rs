//! RfmBuilder -- fluent builder for constructing [`RfmDevice`] instances.
//!
//! Separates configuration from construction so that callers can set the
//! serial port, timeouts, and buffered I/O chunk size before the session is
//! opened.
//!
//! # Example
//!
//! ```no_run
//! use rfmusb::builder::RfmBuilder;
//! use rfmusb::models::rfm95w;
//! use std::time::Duration;
//!
//! # async fn example() -> rfmusb_core::Result<()> {
//! let device = RfmBuilder::new(rfm95w())
//!     .serial_port("/dev/ttyACM0")
//!     .read_timeout(Duration::from_millis(300))
//!     .verify_on_connect(true)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use rfmusb_core::error::{Error, Result};
use rfmusb_core::transport::Transport;
use rfmusb_protocol::{Session, SessionConfig};

use crate::device::RfmDevice;
use crate::models::RfmModel;

/// Fluent builder for [`RfmDevice`].
///
/// Defaults come from the [`RfmModel`] and [`SessionConfig::default`].
pub struct RfmBuilder {
    model: RfmModel,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    read_timeout: Duration,
    write_timeout: Duration,
    chunk_size: Option<usize>,
    verify_on_connect: bool,
}

impl RfmBuilder {
    /// Create a new builder for the given module.
    pub fn new(model: RfmModel) -> Self {
        let session = SessionConfig::default();
        RfmBuilder {
            model,
            serial_port: None,
            baud_rate: None,
            read_timeout: session.read_timeout,
            write_timeout: session.write_timeout,
            chunk_size: None,
            verify_on_connect: false,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyACM0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the model's default baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// How long to wait for each reply line (default: 500ms).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// How long a command write may take (default: 500ms).
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Bytes per buffered write command (default: the model's chunk size).
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = Some(bytes);
        self
    }

    /// Query the firmware version right after connecting, so a wrong port
    /// or a silent bridge fails at build time.
    pub fn verify_on_connect(mut self, enabled: bool) -> Self {
        self.verify_on_connect = enabled;
        self
    }

    /// Build an [`RfmDevice`] on a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `rfmusb-test-harness`) and for callers managing their own transport.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<RfmDevice> {
        let chunk_size = self.chunk_size.unwrap_or(self.model.buffered_chunk_size);
        if chunk_size == 0 {
            return Err(Error::InvalidParameter("chunk_size must be non-zero".into()));
        }

        let config = SessionConfig {
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
        };
        let session = Arc::new(Session::with_transport(transport, config));
        let device = RfmDevice::new(session, self.model, chunk_size);

        if self.verify_on_connect {
            let version = device.firmware_version().await?;
            info!(
                model = device.model().name,
                firmware = %version,
                "bridge verified"
            );
        }

        Ok(device)
    }

    /// Build an [`RfmDevice`] on a serial port.
    ///
    /// Requires [`serial_port()`](Self::serial_port). The baud rate defaults
    /// to the model's.
    pub async fn build(self) -> Result<RfmDevice> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let baud = self.baud_rate.unwrap_or(self.model.default_baud_rate);

        let transport = rfmusb_transport::SerialTransport::open(port, baud).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
