//! The [`Command`] value and its wire serialization.
//!
//! A command is a mnemonic token followed by zero or more space-separated
//! arguments, terminated by a newline:
//!
//! ```text
//! <mnemonic> [<arg1> [<arg2> ...]]\n
//! ```
//!
//! Mnemonics are `<category>-<abbreviation>` tokens such as `rf-frq`
//! (radio / frequency) or `bi-wr` (buffered I/O / write).

use std::fmt;

use bytes::{BufMut, BytesMut};

use rfmusb_core::error::Result;

use crate::codec::WireValue;

/// Line terminator appended to every command.
pub const LINE_TERMINATOR: u8 = b'\n';

/// One command line, built per call and discarded after the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    mnemonic: String,
    args: Vec<String>,
}

impl Command {
    /// A command with no arguments (typically a read).
    pub fn new(mnemonic: impl Into<String>) -> Self {
        Command {
            mnemonic: mnemonic.into(),
            args: Vec::new(),
        }
    }

    /// Append an already-encoded argument token.
    pub fn arg(mut self, token: impl Into<String>) -> Self {
        self.args.push(token.into());
        self
    }

    /// Append a typed argument, encoded with the wire codec.
    pub fn value<T: WireValue>(self, value: &T) -> Result<Self> {
        Ok(self.arg(value.encode()?))
    }

    /// The mnemonic token.
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// The encoded arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Serialize to the bytes sent on the wire, terminator included.
    ///
    /// # Example
    ///
    /// ```
    /// use rfmusb_protocol::Command;
    ///
    /// let cmd = Command::new("rf-frq").arg("0xE4C000");
    /// assert_eq!(cmd.to_wire(), b"rf-frq 0xE4C000\n");
    /// ```
    pub fn to_wire(&self) -> Vec<u8> {
        let capacity = self.mnemonic.len()
            + self.args.iter().map(|a| a.len() + 1).sum::<usize>()
            + 1;
        let mut buf = BytesMut::with_capacity(capacity);
        buf.put_slice(self.mnemonic.as_bytes());
        for arg in &self.args {
            buf.put_u8(b' ');
            buf.put_slice(arg.as_bytes());
        }
        buf.put_u8(LINE_TERMINATOR);
        buf.to_vec()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
