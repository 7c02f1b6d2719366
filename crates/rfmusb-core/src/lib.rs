//! rfmusb-core: Core traits, types, and error definitions for rfmusb.
//!
//! This crate defines the pieces every other rfmusb crate agrees on: the
//! byte-level [`Transport`] the protocol engine talks through, the single
//! [`Error`] taxonomy, and the small value types that cross crate
//! boundaries.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level channel to the USB serial bridge
//! - [`BufferedIoInfo`] -- capacity/occupancy of the on-module staging buffer
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use rfmusb_core::*`.
pub use error::{Error, Result};
pub use transport::Transport;
pub use types::BufferedIoInfo;
