//! Wire codec: domain values to and from the bridge's textual encoding.
//!
//! Encoding rules, fixed by the firmware:
//!
//! | Type | Wire form | Example |
//! |------|-----------|---------|
//! | `bool` | `1` / `0` | `1` |
//! | `u8`/`u16`/`u32` | `0x` + uppercase hex, unpadded | `0x6C8000` |
//! | `i8` | `0x` + two's-complement byte, exactly two digits | `-114` → `0x8E` |
//! | enum (`wire_enum!`) | as its `u8` ordinal | `0x3` |
//! | `Vec<u8>` | uppercase hex pairs, no prefix, no separator | `AA55DEAD` |
//! | `String` | verbatim, no whitespace | `RFM69HCW-1.4` |
//!
//! Decoding mirrors encoding and fails with [`Error::Protocol`] rather than
//! falling back to a default.

use std::fmt::Write as _;
use std::str::FromStr;

use rfmusb_core::error::{Error, Result};

/// A value that can travel as a single whitespace-free wire token.
pub trait WireValue: Sized {
    /// Encode into the wire token.
    fn encode(&self) -> Result<String>;

    /// Decode from a wire token (surrounding whitespace already trimmed).
    fn decode(text: &str) -> Result<Self>;
}

fn strip_hex_prefix(text: &str) -> &str {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

/// Parse a hex number with an optional `0x` prefix into a `u32`.
pub fn parse_hex_u32(text: &str) -> Result<u32> {
    let digits = strip_hex_prefix(text.trim());
    if digits.is_empty() {
        return Err(Error::Protocol(format!("expected hex number, got '{text}'")));
    }
    u32::from_str_radix(digits, 16)
        .map_err(|e| Error::Protocol(format!("invalid hex number '{text}': {e}")))
}

/// Parse a decimal number.
pub fn parse_decimal<T>(text: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse::<T>()
        .map_err(|e| Error::Protocol(format!("invalid decimal number '{text}': {e}")))
}

/// Encode bytes as concatenated uppercase hex pairs (`[0xAA, 0x55]` → `AA55`).
pub fn encode_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        // Writing to a String cannot fail.
        let _ = write!(out, "{b:02X}");
    }
    out
}

/// Decode a hex blob (optional `0x` prefix) into bytes, two digits per byte
/// from the left.
pub fn decode_bytes(text: &str) -> Result<Vec<u8>> {
    let digits = strip_hex_prefix(text.trim());
    if digits.len() % 2 != 0 {
        return Err(Error::Protocol(format!(
            "hex byte string has odd length {}: '{text}'",
            digits.len()
        )));
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| Error::Protocol(format!("invalid hex byte string '{text}'")))
        })
        .collect()
}

impl WireValue for bool {
    fn encode(&self) -> Result<String> {
        Ok(if *self { "1" } else { "0" }.to_string())
    }

    fn decode(text: &str) -> Result<Self> {
        match text.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(Error::Protocol(format!("expected 0 or 1, got '{other}'"))),
        }
    }
}

macro_rules! unsigned_wire_value {
    ($($t:ty),+) => {
        $(
            impl WireValue for $t {
                fn encode(&self) -> Result<String> {
                    Ok(format!("0x{:X}", self))
                }

                fn decode(text: &str) -> Result<Self> {
                    let raw = parse_hex_u32(text)?;
                    <$t>::try_from(raw).map_err(|_| {
                        Error::Protocol(format!(
                            concat!("value '{}' does not fit in ", stringify!($t)),
                            text
                        ))
                    })
                }
            }
        )+
    };
}

unsigned_wire_value!(u8, u16, u32);

impl WireValue for i8 {
    fn encode(&self) -> Result<String> {
        Ok(format!("0x{:02X}", *self as u8))
    }

    fn decode(text: &str) -> Result<Self> {
        let raw = <u8 as WireValue>::decode(text)?;
        Ok(raw as i8)
    }
}

impl WireValue for Vec<u8> {
    fn encode(&self) -> Result<String> {
        Ok(encode_bytes(self))
    }

    fn decode(text: &str) -> Result<Self> {
        decode_bytes(text)
    }
}

impl WireValue for String {
    fn encode(&self) -> Result<String> {
        if self.is_empty() || self.chars().any(char::is_whitespace) {
            return Err(Error::InvalidParameter(format!(
                "string '{self}' cannot be sent: wire values must be non-empty and contain no whitespace"
            )));
        }
        Ok(self.clone())
    }

    fn decode(text: &str) -> Result<Self> {
        Ok(text.trim().to_string())
    }
}

/// Declare a `u8`-backed enumeration that travels as its hex ordinal.
///
/// Generates the enum, an `ALL` table, `TryFrom<u8>` (undefined ordinals are
/// a protocol error) and a [`WireValue`] implementation.
///
/// ```
/// rfmusb_protocol::wire_enum! {
///     /// Packet format.
///     pub enum PacketFormat {
///         Fixed = 0,
///         Variable = 1,
///     }
/// }
///
/// use rfmusb_protocol::WireValue;
/// assert_eq!(PacketFormat::Variable.encode().unwrap(), "0x1");
/// assert_eq!(PacketFormat::decode("0x0").unwrap(), PacketFormat::Fixed);
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl ::core::convert::TryFrom<u8> for $name {
            type Error = $crate::Error;

            fn try_from(raw: u8) -> ::core::result::Result<Self, Self::Error> {
                match raw {
                    $( x if x == $name::$variant as u8 => Ok($name::$variant), )+
                    other => Err($crate::Error::Protocol(format!(
                        concat!("undefined ", stringify!($name), " ordinal 0x{:02X}"),
                        other
                    ))),
                }
            }
        }

        impl $crate::codec::WireValue for $name {
            fn encode(&self) -> $crate::Result<String> {
                <u8 as $crate::codec::WireValue>::encode(&(*self as u8))
            }

            fn decode(text: &str) -> $crate::Result<Self> {
                let raw = <u8 as $crate::codec::WireValue>::decode(text)?;
                <Self as ::core::convert::TryFrom<u8>>::try_from(raw)
            }
        }
    };
}
