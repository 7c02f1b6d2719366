//! RfmDevice -- typed access to one radio module behind the bridge.
//!
//! Scalar settings go through the register table ([`get`](RfmDevice::get),
//! [`set`](RfmDevice::set)). Status words that the bridge reports as flag
//! sequences, the register dump, and the buffered I/O stream have dedicated
//! methods. Every method is one awaited call; multi-line replies are read on
//! a single exchange so no other command can interleave.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use rfmusb_core::error::{Error, Result};
use rfmusb_core::types::BufferedIoInfo;
use rfmusb_protocol::codec::{WireValue, parse_hex_u32};
use rfmusb_protocol::stream::{self, BufferedStream};
use rfmusb_protocol::{Command, FlagTable, Session, flags, reply};

use crate::bitmasks::{DioMask, LoraIrqFlags, LoraIrqMask, ModemStatus, Rfm9xIrqFlags, Rfm69IrqFlags};
use crate::models::{Family, RfmModel};
use crate::registers::{Register, base};

const CMD_RESET: &str = "dv-rst";
const CMD_DUMP: &str = "dv-dmp";
const CMD_IRQ_FLAGS: &str = "ir-flg";
const CMD_DIO_MASK: &str = "ir-dio";
const CMD_MODEM_STATUS: &str = "lr-mst";
const CMD_LORA_IRQ_FLAGS: &str = "lr-irq";
const CMD_LORA_IRQ_MASK: &str = "lr-msk";

/// Lines in a DIO mask reply, one per pin.
const DIO_LINES: usize = 6;
/// Lines in a modem status reply, one per status bit.
const MODEM_STATUS_LINES: usize = 5;

/// A radio module reachable through an open session.
///
/// Constructed via [`RfmBuilder`](crate::builder::RfmBuilder).
pub struct RfmDevice {
    session: Arc<Session>,
    model: RfmModel,
    chunk_size: usize,
}

impl RfmDevice {
    pub(crate) fn new(session: Arc<Session>, model: RfmModel, chunk_size: usize) -> Self {
        RfmDevice {
            session,
            model,
            chunk_size,
        }
    }

    pub fn model(&self) -> &RfmModel {
        &self.model
    }

    /// The underlying session, for raw commands.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn require_family(&self, families: Family, what: &str) -> Result<()> {
        if self.model.family.intersects(families) {
            Ok(())
        } else {
            Err(Error::Unsupported(format!(
                "{what} is not available on {}",
                self.model.name
            )))
        }
    }

    // -----------------------------------------------------------------
    // Registers
    // -----------------------------------------------------------------

    /// Read a register.
    pub async fn get<T: WireValue>(&self, register: &Register<T>) -> Result<T> {
        self.require_family(register.families, register.name)?;
        if !register.access.readable() {
            return Err(Error::InvalidParameter(format!(
                "{} is write-only",
                register.name
            )));
        }

        let command = Command::new(register.mnemonic);
        let line = self.session.execute(&command).await?;
        if reply::is_error(&line) {
            return Err(reply::classify(&command, &line));
        }
        T::decode(&line)
    }

    /// Write a register; the bridge must answer `OK`.
    pub async fn set<T: WireValue>(&self, register: &Register<T>, value: &T) -> Result<()> {
        self.require_family(register.families, register.name)?;
        if !register.access.writable() {
            return Err(Error::InvalidParameter(format!(
                "{} is read-only",
                register.name
            )));
        }

        let command = Command::new(register.mnemonic).value(value)?;
        self.session
            .execute_with_check(&command, reply::OK)
            .await
            .map(|_| ())
    }

    pub async fn firmware_version(&self) -> Result<String> {
        self.get(&base::FIRMWARE_VERSION).await
    }

    pub async fn serial_number(&self) -> Result<String> {
        self.get(&base::SERIAL_NUMBER).await
    }

    /// Reset the radio module. Register values return to their defaults.
    pub async fn reset(&self) -> Result<()> {
        self.session
            .execute_with_check(&Command::new(CMD_RESET), reply::OK)
            .await?;
        debug!(model = self.model.name, "module reset");
        Ok(())
    }

    /// Raw `(address, value)` pairs of every radio register.
    ///
    /// The bridge sends no end marker, so this always waits one full read
    /// timeout after the last line.
    pub async fn register_dump(&self) -> Result<Vec<(u8, u8)>> {
        let command = Command::new(CMD_DUMP);
        let lines = self.session.execute_list(&command).await?;
        if let Some(first) = lines.first().filter(|line| reply::is_error(line)) {
            return Err(reply::classify(&command, first));
        }
        lines.iter().map(|line| parse_dump_line(line)).collect()
    }

    // -----------------------------------------------------------------
    // Flag sequences
    // -----------------------------------------------------------------

    async fn read_while_buffered<T: FlagTable>(&self, mnemonic: &str) -> Result<T> {
        let mut exchange = self.session.exchange().await?;
        flags::read_while_buffered(&mut exchange, &Command::new(mnemonic)).await
    }

    async fn read_fixed<T: FlagTable>(&self, mnemonic: &str, count: usize) -> Result<T> {
        let mut exchange = self.session.exchange().await?;
        flags::read_fixed(&mut exchange, &Command::new(mnemonic), count).await
    }

    async fn write_mask(&self, mnemonic: &str, bits: u8) -> Result<()> {
        let command = Command::new(mnemonic).value(&bits)?;
        self.session
            .execute_with_check(&command, reply::OK)
            .await
            .map(|_| ())
    }

    /// Interrupt flags of an RFM69 module.
    pub async fn rfm69_irq_flags(&self) -> Result<Rfm69IrqFlags> {
        self.require_family(Family::RFM69, "RFM69 IRQ flags")?;
        self.read_while_buffered(CMD_IRQ_FLAGS).await
    }

    /// FSK interrupt flags of an RFM9x module.
    pub async fn rfm9x_irq_flags(&self) -> Result<Rfm9xIrqFlags> {
        self.require_family(Family::RFM9X, "RFM9x IRQ flags")?;
        self.read_while_buffered(CMD_IRQ_FLAGS).await
    }

    /// DIO pins that raise bridge interrupts.
    pub async fn dio_mask(&self) -> Result<DioMask> {
        self.read_fixed(CMD_DIO_MASK, DIO_LINES).await
    }

    pub async fn set_dio_mask(&self, mask: DioMask) -> Result<()> {
        self.write_mask(CMD_DIO_MASK, mask.bits()).await
    }

    pub async fn modem_status(&self) -> Result<ModemStatus> {
        self.require_family(Family::RFM9X, "modem status")?;
        self.read_fixed(CMD_MODEM_STATUS, MODEM_STATUS_LINES).await
    }

    pub async fn lora_irq_flags(&self) -> Result<LoraIrqFlags> {
        self.require_family(Family::RFM9X, "LoRa IRQ flags")?;
        self.read_while_buffered(CMD_LORA_IRQ_FLAGS).await
    }

    pub async fn lora_irq_mask(&self) -> Result<LoraIrqMask> {
        self.require_family(Family::RFM9X, "LoRa IRQ mask")?;
        self.read_while_buffered(CMD_LORA_IRQ_MASK).await
    }

    pub async fn set_lora_irq_mask(&self, mask: LoraIrqMask) -> Result<()> {
        self.require_family(Family::RFM9X, "LoRa IRQ mask")?;
        self.write_mask(CMD_LORA_IRQ_MASK, mask.bits()).await
    }

    // -----------------------------------------------------------------
    // Buffered I/O
    // -----------------------------------------------------------------

    /// The staging buffer as a stream, using the configured chunk size.
    pub fn buffered_stream(&self) -> Result<BufferedStream> {
        BufferedStream::new(Arc::clone(&self.session)).with_max_chunk(self.chunk_size)
    }

    pub async fn buffered_io_info(&self) -> Result<BufferedIoInfo> {
        let mut exchange = self.session.exchange().await?;
        stream::query_info(&mut exchange).await
    }

    /// Stage `data` and transmit it as one packet.
    pub async fn transmit(&self, data: &[u8]) -> Result<()> {
        let mut exchange = self.session.exchange().await?;
        stream::write_buffered(&mut exchange, data, self.chunk_size).await
    }

    /// Take received bytes from the staging buffer.
    pub async fn receive(&self, buf: &mut [u8]) -> Result<usize> {
        let mut exchange = self.session.exchange().await?;
        stream::read_buffered(&mut exchange, buf).await
    }

    // -----------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------

    pub async fn is_open(&self) -> bool {
        self.session.is_open().await
    }

    pub async fn close(&self) -> Result<()> {
        self.session.close().await
    }

    pub async fn read_timeout(&self) -> Duration {
        self.session.read_timeout().await
    }

    pub async fn set_read_timeout(&self, timeout: Duration) {
        self.session.set_read_timeout(timeout).await
    }

    pub async fn write_timeout(&self) -> Duration {
        self.session.write_timeout().await
    }

    pub async fn set_write_timeout(&self, timeout: Duration) {
        self.session.set_write_timeout(timeout).await
    }
}

/// Parse one `0xAA=0xVV` register dump line.
fn parse_dump_line(line: &str) -> Result<(u8, u8)> {
    let (address, value) = line
        .split_once('=')
        .ok_or_else(|| Error::Protocol(format!("malformed register dump line '{line}'")))?;
    let address = u8::try_from(parse_hex_u32(address)?)
        .map_err(|_| Error::Protocol(format!("register address out of range in '{line}'")))?;
    let value = u8::decode(value)?;
    Ok((address, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{rfm69hcw, rfm95w};
    use crate::registers::{rfm69, rfm9x};
    use crate::types::{Mode, SpreadingFactor};
    use rfmusb_protocol::SessionConfig;
    use rfmusb_test_harness::MockTransport;

    fn make_device(mock: MockTransport, model: RfmModel) -> RfmDevice {
        let session = Session::with_transport(Box::new(mock), SessionConfig::default());
        RfmDevice::new(Arc::new(session), model, 64)
    }

    // -----------------------------------------------------------------
    // Registers
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn get_frequency() {
        let mut mock = MockTransport::new();
        mock.expect_reply("rf-frq", "0xE4C000");
        let device = make_device(mock, rfm69hcw());

        assert_eq!(device.get(&base::FREQUENCY).await.unwrap(), 0xE4C000);
    }

    #[tokio::test]
    async fn set_output_power_negative() {
        let mut mock = MockTransport::new();
        mock.expect_reply("rf-pwr 0xFE", "OK");
        let device = make_device(mock, rfm69hcw());

        device.set(&base::OUTPUT_POWER, &-2).await.unwrap();
    }

    #[tokio::test]
    async fn get_enum_register() {
        let mut mock = MockTransport::new();
        mock.expect_reply("rf-opm", "0x4");
        let device = make_device(mock, rfm95w());

        assert_eq!(device.get(&base::MODE).await.unwrap(), Mode::Receive);
    }

    #[tokio::test]
    async fn set_sync_word_bytes() {
        let mut mock = MockTransport::new();
        mock.expect_reply("pk-syn AA55DEAD", "OK");
        let device = make_device(mock, rfm69hcw());

        device
            .set(&base::SYNC_WORD, &vec![0xAA, 0x55, 0xDE, 0xAD])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn set_rejected_by_device() {
        let mut mock = MockTransport::new();
        mock.expect_reply("lr-sf 0xC", "ERROR:INVALID_ARG");
        let device = make_device(mock, rfm95w());

        let result = device
            .set(&rfm9x::SPREADING_FACTOR, &SpreadingFactor::Sf12)
            .await;
        assert!(matches!(result, Err(Error::CommandExecutionFailed { .. })));
    }

    #[tokio::test]
    async fn get_error_reply_is_classified() {
        let mut mock = MockTransport::new();
        mock.expect_reply("rf-frq", "ERROR:BUSY");
        let device = make_device(mock, rfm69hcw());

        let result = device.get(&base::FREQUENCY).await;
        assert!(matches!(result, Err(Error::CommandExecutionFailed { .. })));
    }

    #[tokio::test]
    async fn malformed_value_is_protocol_error() {
        let mut mock = MockTransport::new();
        mock.expect_reply("pk-pln", "0x1FF");
        let device = make_device(mock, rfm69hcw());

        let result = device.get(&base::PAYLOAD_LENGTH).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn access_direction_is_enforced() {
        let device = make_device(MockTransport::new(), rfm69hcw());

        let result = device.get(&rfm69::AES_KEY).await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        let result = device.set(&base::RSSI, &-40).await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn family_is_enforced() {
        let device = make_device(MockTransport::new(), rfm69hcw());
        let result = device.get(&rfm9x::SPREADING_FACTOR).await;
        assert!(matches!(result, Err(Error::Unsupported(_))));

        let device = make_device(MockTransport::new(), rfm95w());
        let result = device.set(&rfm69::LISTEN_ON, &true).await;
        assert!(matches!(result, Err(Error::Unsupported(_))));
    }

    #[tokio::test]
    async fn device_identity() {
        let mut mock = MockTransport::new();
        mock.expect_reply("dv-fv", "1.4.2");
        mock.expect_reply("dv-sn", "A1B2C3D4");
        let device = make_device(mock, rfm95w());

        assert_eq!(device.firmware_version().await.unwrap(), "1.4.2");
        assert_eq!(device.serial_number().await.unwrap(), "A1B2C3D4");
    }

    #[tokio::test]
    async fn reset_requires_ok() {
        let mut mock = MockTransport::new();
        mock.expect_reply("dv-rst", "OK");
        let device = make_device(mock, rfm95w());
        device.reset().await.unwrap();
    }

    #[tokio::test]
    async fn register_dump_parses_pairs() {
        let mut mock = MockTransport::new();
        mock.expect_lines("dv-dmp", &["0x01=0x04", "0x02=0x00", "0x07=0xE4"]);
        let device = make_device(mock, rfm69hcw());

        let dump = device.register_dump().await.unwrap();
        assert_eq!(dump, vec![(0x01, 0x04), (0x02, 0x00), (0x07, 0xE4)]);
    }

    #[test]
    fn dump_line_errors() {
        assert!(matches!(parse_dump_line("0x01"), Err(Error::Protocol(_))));
        assert!(matches!(parse_dump_line("0x100=0x00"), Err(Error::Protocol(_))));
        assert!(matches!(parse_dump_line("0x01=zz"), Err(Error::Protocol(_))));
    }

    // -----------------------------------------------------------------
    // Flag sequences
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn rfm69_irq_flags_self_terminating() {
        let mut mock = MockTransport::new();
        mock.expect_lines(
            "ir-flg",
            &["1:MODE_READY", "0:RX_READY", "1:PAYLOAD_READY", "1:CRC_OK"],
        );
        mock.expect_reply("rf-opm", "0x1");
        let device = make_device(mock, rfm69hcw());

        let flags = device.rfm69_irq_flags().await.unwrap();
        assert_eq!(
            flags,
            Rfm69IrqFlags::MODE_READY | Rfm69IrqFlags::PAYLOAD_READY | Rfm69IrqFlags::CRC_OK
        );
        // The following transaction is not disturbed.
        assert_eq!(device.get(&base::MODE).await.unwrap(), Mode::Standby);
    }

    #[tokio::test]
    async fn dio_mask_fixed_count() {
        let mut mock = MockTransport::new();
        mock.expect_lines(
            "ir-dio",
            &[
                "0x01-DIO0",
                "0x00-DIO1",
                "0x00-DIO2",
                "0x01-DIO3",
                "0x00-DIO4",
                "0x00-DIO5",
            ],
        );
        let device = make_device(mock, rfm95w());

        assert_eq!(device.dio_mask().await.unwrap(), DioMask::DIO0 | DioMask::DIO3);
    }

    #[tokio::test]
    async fn set_dio_mask_sends_hex_byte() {
        let mut mock = MockTransport::new();
        mock.expect_reply("ir-dio 0x21", "OK");
        let device = make_device(mock, rfm95w());

        device
            .set_dio_mask(DioMask::DIO0 | DioMask::DIO5)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn modem_status_fixed_count() {
        let mut mock = MockTransport::new();
        mock.expect_lines(
            "lr-mst",
            &[
                "1:MODEM_CLEAR",
                "0:HEADER_INFO_VALID",
                "0:RX_ONGOING",
                "0:SIGNAL_SYNCHRONIZED",
                "1:SIGNAL_DETECTED",
            ],
        );
        let device = make_device(mock, rfm95w());

        assert_eq!(
            device.modem_status().await.unwrap(),
            ModemStatus::MODEM_CLEAR | ModemStatus::SIGNAL_DETECTED
        );
    }

    #[tokio::test]
    async fn lora_irq_round_trip() {
        let mut mock = MockTransport::new();
        mock.expect_lines("lr-irq", &["1:TX_DONE", "0:RX_DONE"]);
        mock.expect_reply("lr-msk 0xC0", "OK");
        mock.expect_lines("lr-msk", &["1:RX_TIMEOUT", "1:RX_DONE"]);
        let device = make_device(mock, rfm95w());

        assert_eq!(device.lora_irq_flags().await.unwrap(), LoraIrqFlags::TX_DONE);
        device
            .set_lora_irq_mask(LoraIrqMask::RX_TIMEOUT | LoraIrqMask::RX_DONE)
            .await
            .unwrap();
        assert_eq!(
            device.lora_irq_mask().await.unwrap(),
            LoraIrqMask::RX_TIMEOUT | LoraIrqMask::RX_DONE
        );
    }

    #[tokio::test]
    async fn lora_status_unsupported_on_rfm69() {
        let device = make_device(MockTransport::new(), rfm69hcw());
        assert!(matches!(device.modem_status().await, Err(Error::Unsupported(_))));
        assert!(matches!(device.lora_irq_flags().await, Err(Error::Unsupported(_))));
        assert!(matches!(device.rfm9x_irq_flags().await, Err(Error::Unsupported(_))));
    }

    // -----------------------------------------------------------------
    // Buffered I/O
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn transmit_checks_capacity_first() {
        let mut mock = MockTransport::new();
        mock.expect_reply("bi-inf", "100 90");
        let device = make_device(mock, rfm95w());

        let result = device.transmit(&[0u8; 20]).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientCapacity {
                requested: 20,
                available: 10
            })
        ));
    }

    #[tokio::test]
    async fn transmit_and_receive() {
        let mut mock = MockTransport::new();
        mock.expect_reply("bi-inf", "100 0");
        mock.expect_reply("bi-wr 010203", "OK");
        mock.expect_reply("bi-tx", "OK");
        mock.expect_reply("bi-inf", "100 2");
        mock.expect_reply("bi-rd 2", "CAFE");
        let device = make_device(mock, rfm95w());

        device.transmit(&[1, 2, 3]).await.unwrap();
        let mut buf = [0u8; 16];
        let n = device.receive(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0xCA, 0xFE]);
    }

    #[tokio::test]
    async fn buffered_io_info_passthrough() {
        let mut mock = MockTransport::new();
        mock.expect_reply("bi-inf", "256 12");
        let device = make_device(mock, rfm95w());

        let info = device.buffered_io_info().await.unwrap();
        assert_eq!(info.capacity, 256);
        assert_eq!(info.count, 12);
        assert_eq!(device.buffered_stream().unwrap().max_chunk(), 64);
    }

    #[tokio::test]
    async fn close_then_operations_fail() {
        let device = make_device(MockTransport::new(), rfm95w());
        assert!(device.is_open().await);
        device.close().await.unwrap();
        assert!(!device.is_open().await);
        assert!(matches!(device.firmware_version().await, Err(Error::NotOpen)));
    }
}
