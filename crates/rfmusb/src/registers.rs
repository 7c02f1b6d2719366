//! Register table.
//!
//! Every scalar module setting is a [`Register`] constant: a mnemonic, the
//! value type it travels as, the allowed access direction, and the module
//! families that have it. [`RfmDevice::get`](crate::RfmDevice::get) and
//! [`RfmDevice::set`](crate::RfmDevice::set) turn a register into the
//! matching command, so adding a setting is one line here.
//!
//! Mnemonics follow `<group>-<abbr>`: `rf` for the RF front end, `pk` for
//! the packet engine, `ls` for listen mode, `lr` for LoRa, `dv` for the
//! bridge device itself.

use std::fmt;
use std::marker::PhantomData;

use crate::models::Family;

/// Which directions a register can be accessed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

/// A typed module setting.
pub struct Register<T> {
    pub name: &'static str,
    pub mnemonic: &'static str,
    pub access: Access,
    pub families: Family,
    _value: PhantomData<fn() -> T>,
}

impl<T> Register<T> {
    pub const fn new(
        name: &'static str,
        mnemonic: &'static str,
        access: Access,
        families: Family,
    ) -> Self {
        Register {
            name,
            mnemonic,
            access,
            families,
            _value: PhantomData,
        }
    }

    /// Untyped description, for listing.
    pub fn info(&self) -> RegisterInfo {
        RegisterInfo {
            name: self.name,
            mnemonic: self.mnemonic,
            access: self.access,
            families: self.families,
            value_type: std::any::type_name::<T>(),
        }
    }
}

impl<T> fmt::Debug for Register<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Register")
            .field("name", &self.name)
            .field("mnemonic", &self.mnemonic)
            .field("access", &self.access)
            .field("families", &self.families)
            .finish()
    }
}

/// Type-erased register description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInfo {
    pub name: &'static str,
    pub mnemonic: &'static str,
    pub access: Access,
    pub families: Family,
    pub value_type: &'static str,
}

macro_rules! register_table {
    (
        $families:expr;
        $( $(#[$meta:meta])* $name:ident: $ty:ty = $mnemonic:literal, $access:ident; )+
    ) => {
        $(
            $(#[$meta])*
            pub const $name: Register<$ty> =
                Register::new(stringify!($name), $mnemonic, Access::$access, $families);
        )+

        /// Every register in this table.
        pub fn catalog() -> Vec<RegisterInfo> {
            vec![$($name.info()),+]
        }
    };
}

/// Registers common to every module.
pub mod base {
    use super::{Access, Register, RegisterInfo};
    use crate::models::Family;
    use crate::types::*;

    register_table! {
        Family::all();
        /// Carrier frequency in synthesizer steps.
        FREQUENCY: u32 = "rf-frq", ReadWrite;
        /// FSK frequency deviation in synthesizer steps.
        FREQUENCY_DEVIATION: u32 = "rf-fdv", ReadWrite;
        /// Bit rate divider.
        BIT_RATE: u32 = "rf-btr", ReadWrite;
        MODULATION: ModulationType = "rf-mod", ReadWrite;
        MODE: Mode = "rf-opm", ReadWrite;
        /// Output power in dBm.
        OUTPUT_POWER: i8 = "rf-pwr", ReadWrite;
        /// Last RSSI sample in dBm.
        RSSI: i8 = "rf-rsi", ReadOnly;
        SYNC_WORD: Vec<u8> = "pk-syn", ReadWrite;
        SYNC_SIZE: u8 = "pk-sys", ReadWrite;
        SYNC_ON: bool = "pk-syo", ReadWrite;
        PREAMBLE_LENGTH: u16 = "pk-pre", ReadWrite;
        PAYLOAD_LENGTH: u8 = "pk-pln", ReadWrite;
        /// Direct FIFO access.
        FIFO: Vec<u8> = "pk-ffo", ReadWrite;
        FIFO_THRESHOLD: u8 = "pk-fth", ReadWrite;
        CRC_ON: bool = "pk-crc", ReadWrite;
        ADDRESS_FILTERING: AddressFiltering = "pk-afl", ReadWrite;
        NODE_ADDRESS: u8 = "pk-nad", ReadWrite;
        BROADCAST_ADDRESS: u8 = "pk-bad", ReadWrite;
        PACKET_FORMAT: PacketFormat = "pk-fmt", ReadWrite;
        DC_FREE: DcFree = "pk-dcf", ReadWrite;
        /// Radio chip silicon revision.
        SILICON_VERSION: u8 = "dv-ver", ReadOnly;
        /// Bridge firmware version string.
        FIRMWARE_VERSION: String = "dv-fv", ReadOnly;
        /// Bridge serial number.
        SERIAL_NUMBER: String = "dv-sn", ReadOnly;
    }
}

/// RFM69-only registers.
pub mod rfm69 {
    use super::{Access, Register, RegisterInfo};
    use crate::models::Family;
    use crate::types::*;

    register_table! {
        Family::RFM69;
        /// 16-byte AES key. The module never reports it back.
        AES_KEY: Vec<u8> = "pk-aes", WriteOnly;
        AES_ON: bool = "pk-aeo", ReadWrite;
        LNA_GAIN: LnaGain = "rf-lna", ReadWrite;
        /// Die temperature in degrees Celsius, uncalibrated.
        TEMPERATURE: i8 = "dv-tmp", ReadOnly;
        OCP_ON: bool = "rf-ocp", ReadWrite;
        LISTEN_RESOLUTION_IDLE: ListenResolution = "ls-rsi", ReadWrite;
        LISTEN_RESOLUTION_RX: ListenResolution = "ls-rsr", ReadWrite;
        LISTEN_COEF_IDLE: u8 = "ls-cfi", ReadWrite;
        LISTEN_COEF_RX: u8 = "ls-cfr", ReadWrite;
        LISTEN_CRITERIA: ListenCriteria = "ls-crt", ReadWrite;
        LISTEN_END: ListenEnd = "ls-end", ReadWrite;
        LISTEN_ON: bool = "ls-on", ReadWrite;
    }
}

/// RFM9x-only registers (LoRa modem).
pub mod rfm9x {
    use super::{Access, Register, RegisterInfo};
    use crate::models::Family;
    use crate::types::*;

    register_table! {
        Family::RFM9X;
        /// LoRa (true) or FSK/OOK (false) modem.
        LORA_MODE: bool = "lr-on", ReadWrite;
        SPREADING_FACTOR: SpreadingFactor = "lr-sf", ReadWrite;
        BANDWIDTH: LoraBandwidth = "lr-bw", ReadWrite;
        CODING_RATE: CodingRate = "lr-cr", ReadWrite;
        IMPLICIT_HEADER: bool = "lr-imp", ReadWrite;
        LORA_SYNC_WORD: u8 = "lr-syn", ReadWrite;
        LORA_PAYLOAD_LENGTH: u8 = "lr-pln", ReadWrite;
        /// SNR of the last packet, in quarter dB.
        PACKET_SNR: i8 = "lr-snr", ReadOnly;
        /// RSSI of the last packet in dBm.
        PACKET_RSSI: i8 = "lr-rsi", ReadOnly;
        LOW_DATA_RATE_OPTIMIZE: bool = "lr-ldo", ReadWrite;
    }
}

/// Every register available on `family`.
pub fn catalog_for(family: Family) -> Vec<RegisterInfo> {
    base::catalog()
        .into_iter()
        .chain(rfm69::catalog())
        .chain(rfm9x::catalog())
        .filter(|info| info.families.intersects(family))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn everything() -> Vec<RegisterInfo> {
        base::catalog()
            .into_iter()
            .chain(rfm69::catalog())
            .chain(rfm9x::catalog())
            .collect()
    }

    #[test]
    fn mnemonics_are_unique() {
        let all = everything();
        let unique: HashSet<_> = all.iter().map(|r| r.mnemonic).collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn mnemonics_are_single_tokens() {
        for reg in everything() {
            assert!(!reg.mnemonic.is_empty());
            assert!(
                !reg.mnemonic.chars().any(char::is_whitespace),
                "{}",
                reg.mnemonic
            );
        }
    }

    #[test]
    fn family_filtering() {
        let rfm69 = catalog_for(Family::RFM69);
        assert!(rfm69.iter().any(|r| r.mnemonic == "pk-aes"));
        assert!(!rfm69.iter().any(|r| r.mnemonic == "lr-sf"));
        assert!(rfm69.iter().any(|r| r.mnemonic == "rf-frq"));

        let rfm9x = catalog_for(Family::RFM9X);
        assert!(rfm9x.iter().any(|r| r.mnemonic == "lr-sf"));
        assert!(!rfm9x.iter().any(|r| r.mnemonic == "ls-on"));
    }

    #[test]
    fn access_directions() {
        assert!(base::RSSI.access.readable());
        assert!(!base::RSSI.access.writable());
        assert!(rfm69::AES_KEY.access.writable());
        assert!(!rfm69::AES_KEY.access.readable());
        assert_eq!(base::FREQUENCY.info().value_type, "u32");
    }
}
