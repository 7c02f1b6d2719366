//! Flag sequences: multi-line replies assembled into bitmask values.
//!
//! Interrupt and status registers are reported one condition per line, as
//! `<state><separator><TAG>`, for example `1:CRC_OK` or `0x01-DIO0`. Each
//! bitmask type says how its lines are shaped through [`FlagTable`]; the
//! tag-to-bit table is the bitflags constant name table of the type, so a
//! tag maps to the flag of the same name.
//!
//! Tags the table does not know are skipped. The firmware may report more
//! conditions than a given host-side type models.

use bitflags::Flags;
use tracing::trace;

use rfmusb_core::error::{Error, Result};

use crate::command::Command;
use crate::reply;
use crate::session::{Exchange, Framing};

/// How the state field of a flag line is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    /// `1` or `0`.
    Binary,
    /// A hex byte (`0x01`); any non-zero value sets the flag.
    Hex,
}

/// A bitmask type that can be decoded from flag lines.
pub trait FlagTable: Flags + Copy {
    /// Character between state and tag.
    const SEPARATOR: char = ':';
    /// Encoding of the state field.
    const STATE: StateFormat = StateFormat::Binary;
}

/// Decode one flag line.
///
/// Returns `Ok(None)` for a tag the table does not know, and an empty value
/// when the state is falsy.
pub fn parse_flag_line<T: FlagTable>(line: &str) -> Result<Option<T>> {
    let (state, tag) = line
        .trim()
        .split_once(T::SEPARATOR)
        .ok_or_else(|| Error::Protocol(format!("malformed flag line {line:?}")))?;
    let (state, tag) = (state.trim(), tag.trim());
    if tag.is_empty() {
        return Err(Error::Protocol(format!("flag line without tag {line:?}")));
    }

    let set = match T::STATE {
        StateFormat::Binary => match state {
            "1" => true,
            "0" => false,
            _ => {
                return Err(Error::Protocol(format!(
                    "invalid flag state {state:?} in {line:?}"
                )));
            }
        },
        StateFormat::Hex => {
            let digits = state
                .strip_prefix("0x")
                .or_else(|| state.strip_prefix("0X"))
                .unwrap_or(state);
            u8::from_str_radix(digits, 16).map_err(|_| {
                Error::Protocol(format!("invalid flag state {state:?} in {line:?}"))
            })? != 0
        }
    };

    let Some(flag) = T::from_name(tag) else {
        trace!(tag, "ignoring unknown flag tag");
        return Ok(None);
    };
    Ok(Some(if set { flag } else { T::empty() }))
}

/// Fold reply lines into one value.
///
/// Any line carrying the error marker is classified against `command`.
pub fn decode_lines<T: FlagTable>(command: &Command, lines: &[String]) -> Result<T> {
    if let Some(error) = lines.iter().find(|line| reply::is_error(line)) {
        return Err(reply::classify(command, error));
    }

    let mut value = T::empty();
    for line in lines {
        if let Some(flag) = parse_flag_line::<T>(line)? {
            value.insert(flag);
        }
    }
    Ok(value)
}

/// Send `command` and decode its flag lines under `framing`.
pub async fn read_flags<T: FlagTable>(
    exchange: &mut Exchange<'_>,
    command: &Command,
    framing: Framing,
) -> Result<T> {
    let lines = exchange.execute_framed(command, framing).await?;
    decode_lines(command, &lines)
}

/// Flag sequence with a fixed number of lines.
pub async fn read_fixed<T: FlagTable>(
    exchange: &mut Exchange<'_>,
    command: &Command,
    count: usize,
) -> Result<T> {
    read_flags(exchange, command, Framing::Fixed(count)).await
}

/// Self-terminating flag sequence: lines are read while more input is
/// already waiting.
pub async fn read_while_buffered<T: FlagTable>(
    exchange: &mut Exchange<'_>,
    command: &Command,
) -> Result<T> {
    read_flags(exchange, command, Framing::WhileBuffered).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, SessionConfig};
    use rfmusb_test_harness::MockTransport;

    bitflags::bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct Irq: u8 {
            const TX_DONE = 0x08;
            const RX_DONE = 0x40;
            const CRC_OK = 0x02;
        }
    }

    impl FlagTable for Irq {}

    bitflags::bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct Dio: u8 {
            const DIO0 = 0x01;
            const DIO1 = 0x02;
            const DIO2 = 0x04;
        }
    }

    impl FlagTable for Dio {
        const SEPARATOR: char = '-';
        const STATE: StateFormat = StateFormat::Hex;
    }

    fn session(mock: MockTransport) -> Session {
        Session::with_transport(Box::new(mock), SessionConfig::default())
    }

    #[test]
    fn parse_binary_line() {
        assert_eq!(parse_flag_line::<Irq>("1:TX_DONE").unwrap(), Some(Irq::TX_DONE));
        assert_eq!(parse_flag_line::<Irq>("0:TX_DONE").unwrap(), Some(Irq::empty()));
    }

    #[test]
    fn parse_hex_line() {
        assert_eq!(parse_flag_line::<Dio>("0x01-DIO1").unwrap(), Some(Dio::DIO1));
        assert_eq!(parse_flag_line::<Dio>("0x00-DIO1").unwrap(), Some(Dio::empty()));
        assert_eq!(parse_flag_line::<Dio>("0x3-DIO2").unwrap(), Some(Dio::DIO2));
    }

    #[test]
    fn unknown_tag_is_skipped() {
        assert_eq!(parse_flag_line::<Irq>("1:SOMETHING_NEW").unwrap(), None);
    }

    #[test]
    fn malformed_lines_fail() {
        assert!(matches!(parse_flag_line::<Irq>("TX_DONE"), Err(Error::Protocol(_))));
        assert!(matches!(parse_flag_line::<Irq>("2:TX_DONE"), Err(Error::Protocol(_))));
        assert!(matches!(parse_flag_line::<Irq>("1:"), Err(Error::Protocol(_))));
        assert!(matches!(parse_flag_line::<Dio>("zz-DIO0"), Err(Error::Protocol(_))));
    }

    #[test]
    fn decode_classifies_error_line() {
        let cmd = Command::new("bi-inf");
        let lines = vec!["ERROR:BUFFERED_IO_NOT_ENABLED".to_string()];
        assert!(matches!(
            decode_lines::<Irq>(&cmd, &lines),
            Err(Error::BufferedIoNotEnabled)
        ));
    }

    #[test]
    fn decode_classifies_error_after_flag_lines() {
        let cmd = Command::new("ir-dio");
        let lines = vec!["0x01-DIO0".to_string(), "ERROR:OVERFLOW".to_string()];
        assert!(matches!(
            decode_lines::<Dio>(&cmd, &lines),
            Err(Error::BufferOverflow)
        ));
    }

    #[tokio::test]
    async fn fixed_count_decode() {
        let mut mock = MockTransport::new();
        mock.expect_lines("ir-dio", &["0x01-DIO0", "0x00-DIO1", "0x01-DIO2"]);
        let session = session(mock);

        let mut exchange = session.exchange().await.unwrap();
        let value: Dio = read_fixed(&mut exchange, &Command::new("ir-dio"), 3)
            .await
            .unwrap();
        assert_eq!(value, Dio::DIO0 | Dio::DIO2);
    }

    #[tokio::test]
    async fn self_terminating_decode_stops_at_boundary() {
        let mut mock = MockTransport::new();
        mock.expect_lines("lr-irq", &["1:TX_DONE", "0:RX_DONE"]);
        mock.expect_reply("dv-fv", "1.4.2");
        let session = session(mock);

        let mut exchange = session.exchange().await.unwrap();
        let value: Irq = read_while_buffered(&mut exchange, &Command::new("lr-irq"))
            .await
            .unwrap();
        assert_eq!(value, Irq::TX_DONE);

        // Nothing was consumed past the flag sequence.
        let next = exchange.execute(&Command::new("dv-fv")).await.unwrap();
        assert_eq!(next, "1.4.2");
    }

    #[tokio::test]
    async fn self_terminating_decode_with_unknown_tags() {
        let mut mock = MockTransport::new();
        mock.expect_lines("lr-irq", &["1:CRC_OK", "1:VENDOR_BIT", "1:RX_DONE"]);
        let session = session(mock);

        let mut exchange = session.exchange().await.unwrap();
        let value: Irq = read_while_buffered(&mut exchange, &Command::new("lr-irq"))
            .await
            .unwrap();
        assert_eq!(value, Irq::CRC_OK | Irq::RX_DONE);
    }

    #[tokio::test]
    async fn device_error_in_flag_read() {
        let mut mock = MockTransport::new();
        mock.expect_lines("lr-irq", &["ERROR:NOT_LORA"]);
        let session = session(mock);

        let mut exchange = session.exchange().await.unwrap();
        let result = read_while_buffered::<Irq>(&mut exchange, &Command::new("lr-irq")).await;
        assert!(matches!(result, Err(Error::CommandExecutionFailed { .. })));
    }
}
