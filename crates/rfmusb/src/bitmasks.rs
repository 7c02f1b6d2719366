//! Interrupt, status, and mask bit sets.
//!
//! The bridge reports these one condition per line; the flag names below
//! are the tags the firmware uses, and the bit values are the register bit
//! positions. 16-bit types pack two consecutive registers, the first one in
//! the high byte.

use bitflags::bitflags;
use rfmusb_protocol::{FlagTable, StateFormat};

bitflags! {
    /// RFM69 `RegIrqFlags1` (high byte) and `RegIrqFlags2` (low byte).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Rfm69IrqFlags: u16 {
        const MODE_READY = 0x8000;
        const RX_READY = 0x4000;
        const TX_READY = 0x2000;
        const PLL_LOCK = 0x1000;
        const RSSI = 0x0800;
        const TIMEOUT = 0x0400;
        const AUTO_MODE = 0x0200;
        const SYNC_ADDRESS_MATCH = 0x0100;
        const FIFO_FULL = 0x0080;
        const FIFO_NOT_EMPTY = 0x0040;
        const FIFO_LEVEL = 0x0020;
        const FIFO_OVERRUN = 0x0010;
        const PACKET_SENT = 0x0008;
        const PAYLOAD_READY = 0x0004;
        const CRC_OK = 0x0002;
        const LOW_BAT = 0x0001;
    }
}

impl FlagTable for Rfm69IrqFlags {}

bitflags! {
    /// RFM9x FSK `RegIrqFlags1` (high byte) and `RegIrqFlags2` (low byte).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Rfm9xIrqFlags: u16 {
        const MODE_READY = 0x8000;
        const RX_READY = 0x4000;
        const TX_READY = 0x2000;
        const PLL_LOCK = 0x1000;
        const RSSI = 0x0800;
        const TIMEOUT = 0x0400;
        const PREAMBLE_DETECT = 0x0200;
        const SYNC_ADDRESS_MATCH = 0x0100;
        const FIFO_FULL = 0x0080;
        const FIFO_EMPTY = 0x0040;
        const FIFO_LEVEL = 0x0020;
        const FIFO_OVERRUN = 0x0010;
        const PACKET_SENT = 0x0008;
        const PAYLOAD_READY = 0x0004;
        const CRC_OK = 0x0002;
        const LOW_BAT = 0x0001;
    }
}

impl FlagTable for Rfm9xIrqFlags {}

bitflags! {
    /// DIO pins routed to the bridge's interrupt inputs.
    ///
    /// Reported as `0x01-DIO0`: hex state, `-` separator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DioMask: u8 {
        const DIO0 = 0x01;
        const DIO1 = 0x02;
        const DIO2 = 0x04;
        const DIO3 = 0x08;
        const DIO4 = 0x10;
        const DIO5 = 0x20;
    }
}

impl FlagTable for DioMask {
    const SEPARATOR: char = '-';
    const STATE: StateFormat = StateFormat::Hex;
}

bitflags! {
    /// LoRa `RegModemStat` status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModemStatus: u8 {
        const MODEM_CLEAR = 0x10;
        const HEADER_INFO_VALID = 0x08;
        const RX_ONGOING = 0x04;
        const SIGNAL_SYNCHRONIZED = 0x02;
        const SIGNAL_DETECTED = 0x01;
    }
}

impl FlagTable for ModemStatus {}

bitflags! {
    /// LoRa `RegIrqFlags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LoraIrqFlags: u8 {
        const RX_TIMEOUT = 0x80;
        const RX_DONE = 0x40;
        const PAYLOAD_CRC_ERROR = 0x20;
        const VALID_HEADER = 0x10;
        const TX_DONE = 0x08;
        const CAD_DONE = 0x04;
        const FHSS_CHANGE_CHANNEL = 0x02;
        const CAD_DETECTED = 0x01;
    }
}

impl FlagTable for LoraIrqFlags {}

bitflags! {
    /// LoRa `RegIrqFlagsMask`. A set bit masks the interrupt.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LoraIrqMask: u8 {
        const RX_TIMEOUT = 0x80;
        const RX_DONE = 0x40;
        const PAYLOAD_CRC_ERROR = 0x20;
        const VALID_HEADER = 0x10;
        const TX_DONE = 0x08;
        const CAD_DONE = 0x04;
        const FHSS_CHANGE_CHANNEL = 0x02;
        const CAD_DETECTED = 0x01;
    }
}

impl FlagTable for LoraIrqMask {}
