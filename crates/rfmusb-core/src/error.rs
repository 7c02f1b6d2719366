//! Error types for rfmusb.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! device-reported errors are all captured here.

/// The error type for all rfmusb operations.
///
/// Device-reported error tokens (`ERROR:<CODE>` replies) that the protocol
/// engine recognises map to dedicated variants; anything else ends up in
/// [`Error::CommandExecutionFailed`] with the raw reply attached.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The named serial port does not exist.
    ///
    /// Carries the ports that were enumerated at the time of the failure so
    /// the caller can report what *is* plugged in.
    #[error("serial port {port} not found (available: {})", .available.join(", "))]
    TransportNotFound { port: String, available: Vec<String> },

    /// The serial port exists but could not be opened (permissions, busy).
    #[error("failed to open serial port {port}: {reason}")]
    TransportOpenFailed { port: String, reason: String },

    /// A transport-level error that does not fit a more specific variant.
    #[error("transport error: {0}")]
    Transport(String),

    /// The reply matched neither the expected success token nor a known
    /// device error token.
    #[error("command '{command}' failed, device replied '{reply}'")]
    CommandExecutionFailed { command: String, reply: String },

    /// The module rejected a buffered I/O operation because buffered I/O is
    /// switched off in the firmware.
    #[error("buffered I/O is not enabled on the device")]
    BufferedIoNotEnabled,

    /// The module rejected a buffered write because it is not in transmit
    /// state.
    #[error("device is not in transmit state")]
    TransmitNotEnabled,

    /// The module reported that its staging buffer overflowed.
    #[error("device buffer overflow")]
    BufferOverflow,

    /// A buffered write was larger than the free space the device reported.
    #[error("insufficient buffer capacity: requested {requested} bytes, {available} available")]
    InsufficientCapacity { requested: usize, available: usize },

    /// A reply could not be decoded (malformed hex, decimal, or flag line).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An operation was attempted before the session was opened.
    #[error("session is not open")]
    NotOpen,

    /// Timed out waiting for the device.
    ///
    /// This typically indicates the module is unpowered, the baud rate is
    /// wrong, or the bridge firmware does not know the command.
    #[error("timeout waiting for response")]
    Timeout,

    /// The connection to the bridge was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An invalid parameter was passed to a command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested operation is not supported by this module variant.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
