//! Transport implementations for rfmusb.
//!
//! This crate provides the concrete [`Transport`](rfmusb_core::Transport)
//! used against real hardware:
//!
//! - [`SerialTransport`]: the USB virtual COM port exposed by the bridge
//!   firmware
//! - [`available_ports`]: enumeration of serial ports present on the host
//!
//! # Example
//!
//! ```no_run
//! use rfmusb_transport::SerialTransport;
//! use rfmusb_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> rfmusb_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 115_200).await?;
//!
//! transport.send(b"dv-fv\n").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_millis(500)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{
    DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits, available_ports,
};
