//! Reply tokens and device error classification.
//!
//! Successful set operations answer `OK`. Failures answer a line carrying
//! the error marker followed by a symbolic code, e.g. `ERROR:OVERFLOW`.
//! Classification is a literal-prefix match of the code against the few
//! codes the protocol engine knows; every other reply becomes
//! [`Error::CommandExecutionFailed`] with the command and raw reply kept for
//! diagnosis.

use rfmusb_core::error::Error;

use crate::command::Command;

/// Success token.
pub const OK: &str = "OK";

/// Marker that introduces a device error code.
pub const ERROR_MARKER: &str = "ERROR:";

/// Device error codes with a dedicated [`Error`] variant.
const KNOWN_ERRORS: &[(&str, fn() -> Error)] = &[
    ("BUFFERED_IO_NOT_ENABLED", || Error::BufferedIoNotEnabled),
    ("NOT_TX", || Error::TransmitNotEnabled),
    ("OVERFLOW", || Error::BufferOverflow),
];

/// Whether a reply line carries a device error token.
pub fn is_error(reply: &str) -> bool {
    reply.contains(ERROR_MARKER)
}

/// Turn an unexpected reply into the matching [`Error`].
pub fn classify(command: &Command, reply: &str) -> Error {
    if let Some(pos) = reply.find(ERROR_MARKER) {
        let code = reply[pos + ERROR_MARKER.len()..].trim();
        if let Some((_, make)) = KNOWN_ERRORS
            .iter()
            .find(|(token, _)| code.starts_with(token))
        {
            return make();
        }
    }
    Error::CommandExecutionFailed {
        command: command.to_string(),
        reply: reply.to_string(),
    }
}

/// Require `reply` to start with `expected`, classifying it otherwise.
pub fn check(command: &Command, reply: &str, expected: &str) -> Result<(), Error> {
    if reply.starts_with(expected) {
        Ok(())
    } else {
        Err(classify(command, reply))
    }
}
