//! Radio module definitions.
//!
//! Each supported module is described by an [`RfmModel`] returned from a
//! factory function. The three modules share a base register model and the
//! same bridge firmware; they differ in which family-specific registers and
//! status words they carry.
//!
//! | Model    | Family | Chip    | Band          | FIFO  |
//! |----------|--------|---------|---------------|-------|
//! | RFM69HCW | RFM69  | SX1231H | 290-1020 MHz  | 66 B  |
//! | RFM95W   | RFM9x  | SX1276  | 862-1020 MHz  | 256 B |
//! | RFM96W   | RFM9x  | SX1276  | 410-525 MHz   | 256 B |

use bitflags::bitflags;

bitflags! {
    /// Module families a register or operation is available on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Family: u8 {
        /// FSK/OOK transceivers with AES and listen mode.
        const RFM69 = 0x01;
        /// FSK/OOK + LoRa transceivers.
        const RFM9X = 0x02;
    }
}

/// Frequency coverage of a module, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyRange {
    pub min_hz: u32,
    pub max_hz: u32,
}

impl FrequencyRange {
    pub fn contains(&self, hz: u32) -> bool {
        (self.min_hz..=self.max_hz).contains(&hz)
    }
}

/// Static definition of a radio module behind the bridge.
#[derive(Debug, Clone)]
pub struct RfmModel {
    /// Model name as printed on the module (e.g. "RFM95W").
    pub name: &'static str,
    /// Register family.
    pub family: Family,
    /// Factory baud rate of the bridge's virtual COM port.
    pub default_baud_rate: u32,
    /// Default payload size of one buffered write command.
    pub buffered_chunk_size: usize,
    /// Size of the radio's packet FIFO in bytes.
    pub fifo_size: usize,
    /// Supported carrier frequencies.
    pub frequency_range: FrequencyRange,
}

impl RfmModel {
    /// Whether the module supports LoRa modulation.
    pub fn has_lora(&self) -> bool {
        self.family.contains(Family::RFM9X)
    }
}

/// RFM69HCW: high-power (+20 dBm) FSK/OOK module.
pub fn rfm69hcw() -> RfmModel {
    RfmModel {
        name: "RFM69HCW",
        family: Family::RFM69,
        default_baud_rate: 115_200,
        buffered_chunk_size: 64,
        fifo_size: 66,
        frequency_range: FrequencyRange {
            min_hz: 290_000_000,
            max_hz: 1_020_000_000,
        },
    }
}

/// RFM95W: LoRa module for the 868/915 MHz bands.
pub fn rfm95w() -> RfmModel {
    RfmModel {
        name: "RFM95W",
        family: Family::RFM9X,
        default_baud_rate: 115_200,
        buffered_chunk_size: 64,
        fifo_size: 256,
        frequency_range: FrequencyRange {
            min_hz: 862_000_000,
            max_hz: 1_020_000_000,
        },
    }
}

/// RFM96W: LoRa module for the 433/470 MHz bands.
pub fn rfm96w() -> RfmModel {
    RfmModel {
        name: "RFM96W",
        family: Family::RFM9X,
        default_baud_rate: 115_200,
        buffered_chunk_size: 64,
        fifo_size: 256,
        frequency_range: FrequencyRange {
            min_hz: 410_000_000,
            max_hz: 525_000_000,
        },
    }
}

/// Every supported model.
pub fn all_models() -> Vec<RfmModel> {
    vec![rfm69hcw(), rfm95w(), rfm96w()]
}

/// Look up a model by name, ignoring ASCII case.
pub fn model_by_name(name: &str) -> Option<RfmModel> {
    all_models()
        .into_iter()
        .find(|m| m.name.eq_ignore_ascii_case(name))
}
