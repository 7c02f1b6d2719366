//! rfmusb-test-harness: Test utilities and mock transports for rfmusb.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the protocol engine and device layer without a bridge plugged in.

pub mod mock_serial;

pub use mock_serial::MockTransport;
