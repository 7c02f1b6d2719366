//! Typed control of RFM69 and RFM9x radio modules through the rfmusb USB
//! serial bridge.
//!
//! This crate sits on top of the protocol engine in `rfmusb-protocol` and
//! provides:
//!
//! - **Models** ([`models`]) -- the supported modules and their families.
//! - **Registers** ([`registers`]) -- the table of typed settings, each one
//!   a [`Register`](registers::Register) constant.
//! - **Value types** ([`types`], [`bitmasks`]) -- enumerated register values
//!   and the interrupt/status bit sets.
//! - **Device** ([`device`]) -- [`RfmDevice`], the typed facade over one
//!   session.
//! - **Builder** ([`builder`]) -- [`RfmBuilder`] for configuring and opening
//!   a device.
//!
//! # Example
//!
//! ```no_run
//! use rfmusb::registers::{base, rfm9x};
//! use rfmusb::types::SpreadingFactor;
//! use rfmusb::{RfmBuilder, models};
//!
//! # async fn example() -> rfmusb_core::Result<()> {
//! let radio = RfmBuilder::new(models::rfm95w())
//!     .serial_port("/dev/ttyACM0")
//!     .build()
//!     .await?;
//!
//! radio.set(&base::FREQUENCY, &0xE4C000).await?;
//! radio.set(&rfm9x::SPREADING_FACTOR, &SpreadingFactor::Sf9).await?;
//! radio.transmit(b"hello").await?;
//! # Ok(())
//! # }
//! ```

pub mod bitmasks;
pub mod builder;
pub mod device;
pub mod models;
pub mod registers;
pub mod types;

pub use rfmusb_core::{BufferedIoInfo, Error, Result};
pub use rfmusb_protocol::BufferedStream;

pub use builder::RfmBuilder;
pub use device::RfmDevice;
pub use models::{Family, RfmModel};
