//! Command/response protocol engine for the rfmusb bridge firmware.
//!
//! The bridge speaks a line-oriented ASCII protocol: one command per line
//! (`<mnemonic> [<arg> ...]\n`), answered by one or more reply lines. This
//! crate turns that into typed operations:
//!
//! - [`codec`] -- encode/decode domain values to and from wire text
//! - [`command`] -- the [`Command`] value and its serialization
//! - [`reply`] -- success/error token handling and device error
//!   classification
//! - [`session`] -- the transaction engine: [`Session`] owns the transport,
//!   [`Exchange`] holds it exclusively for multi-line protocols
//! - [`flags`] -- multi-line flag sequences assembled into bitmask values
//! - [`stream`] -- the module's staging buffer as a chunked byte stream
//!
//! # Example
//!
//! ```no_run
//! use rfmusb_protocol::{Command, Session, SessionConfig};
//!
//! # async fn example() -> rfmusb_core::Result<()> {
//! let session = Session::new(SessionConfig::default());
//! session.open("/dev/ttyACM0", 115_200).await?;
//!
//! let version = session.execute(&Command::new("dv-fv")).await?;
//! println!("firmware {version}");
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod command;
pub mod flags;
pub mod reply;
pub mod session;
pub mod stream;

pub use rfmusb_core::{BufferedIoInfo, Error, Result};

pub use codec::WireValue;
pub use command::Command;
pub use flags::{FlagTable, StateFormat};
pub use session::{Exchange, Framing, Session, SessionConfig};
pub use stream::BufferedStream;
