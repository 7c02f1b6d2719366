//! Enumerated register values.
//!
//! Each enum travels as the hex form of its ordinal, which is the raw field
//! value the module stores.

use rfmusb_protocol::wire_enum;

wire_enum! {
    /// Transceiver operating mode.
    pub enum Mode {
        Sleep = 0,
        Standby = 1,
        FrequencySynth = 2,
        Transmit = 3,
        Receive = 4,
    }
}

wire_enum! {
    /// FSK/OOK modulation scheme.
    pub enum ModulationType {
        Fsk = 0,
        Ook = 1,
    }
}

wire_enum! {
    /// Packet length handling.
    pub enum PacketFormat {
        Fixed = 0,
        Variable = 1,
    }
}

wire_enum! {
    /// Payload encoding used to keep the bit stream DC-free.
    pub enum DcFree {
        None = 0,
        Manchester = 1,
        Whitening = 2,
    }
}

wire_enum! {
    /// Which address bytes a received packet must match.
    pub enum AddressFiltering {
        None = 0,
        Node = 1,
        NodeOrBroadcast = 2,
    }
}

wire_enum! {
    /// LNA gain setting (RFM69).
    pub enum LnaGain {
        /// Gain set by the internal AGC loop.
        Auto = 0,
        Max = 1,
        Minus6Db = 2,
        Minus12Db = 3,
        Minus24Db = 4,
        Minus36Db = 5,
        Minus48Db = 6,
    }
}

wire_enum! {
    /// Time unit of the listen-mode idle and RX periods (RFM69).
    pub enum ListenResolution {
        Us64 = 1,
        Us4100 = 2,
        Ms262 = 3,
    }
}

wire_enum! {
    /// Condition for accepting a packet while in listen mode (RFM69).
    pub enum ListenCriteria {
        RssiThreshold = 0,
        RssiAndSyncAddress = 1,
    }
}

wire_enum! {
    /// What the module does after a listen-mode reception (RFM69).
    pub enum ListenEnd {
        StayInRx = 0,
        RxThenMode = 1,
        RxThenResume = 2,
    }
}

wire_enum! {
    /// LoRa spreading factor (RFM9x).
    pub enum SpreadingFactor {
        Sf6 = 6,
        Sf7 = 7,
        Sf8 = 8,
        Sf9 = 9,
        Sf10 = 10,
        Sf11 = 11,
        Sf12 = 12,
    }
}

wire_enum! {
    /// LoRa signal bandwidth (RFM9x).
    pub enum LoraBandwidth {
        Khz7_8 = 0,
        Khz10_4 = 1,
        Khz15_6 = 2,
        Khz20_8 = 3,
        Khz31_25 = 4,
        Khz41_7 = 5,
        Khz62_5 = 6,
        Khz125 = 7,
        Khz250 = 8,
        Khz500 = 9,
    }
}

wire_enum! {
    /// LoRa forward error correction rate (RFM9x).
    pub enum CodingRate {
        Cr4_5 = 1,
        Cr4_6 = 2,
        Cr4_7 = 3,
        Cr4_8 = 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfmusb_protocol::{Error, WireValue};

    #[test]
    fn every_enum_round_trips() {
        fn check<T: WireValue + PartialEq + std::fmt::Debug + Copy>(all: &[T]) {
            for v in all {
                let text = v.encode().unwrap();
                assert_eq!(T::decode(&text).unwrap(), *v, "{text}");
            }
        }
        check(Mode::ALL);
        check(ModulationType::ALL);
        check(PacketFormat::ALL);
        check(DcFree::ALL);
        check(AddressFiltering::ALL);
        check(LnaGain::ALL);
        check(ListenResolution::ALL);
        check(ListenCriteria::ALL);
        check(ListenEnd::ALL);
        check(SpreadingFactor::ALL);
        check(LoraBandwidth::ALL);
        check(CodingRate::ALL);
    }

    #[test]
    fn ordinal_is_hex() {
        assert_eq!(SpreadingFactor::Sf12.encode().unwrap(), "0xC");
        assert_eq!(Mode::Receive.encode().unwrap(), "0x4");
        assert_eq!(LoraBandwidth::decode("0x9").unwrap(), LoraBandwidth::Khz500);
    }

    #[test]
    fn undefined_ordinal_rejected() {
        assert!(matches!(Mode::decode("0x7"), Err(Error::Protocol(_))));
        assert!(matches!(ListenResolution::decode("0x0"), Err(Error::Protocol(_))));
    }
}
