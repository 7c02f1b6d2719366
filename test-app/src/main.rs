// rfmusb test application -- CLI tool for exercising an RFM69/RFM9x module
// behind the rfmusb bridge, against real hardware or a mock transport.
//
// Usage:
//   rfmusb-test-app list
//   rfmusb-test-app ports
//   rfmusb-test-app --model RFM95W registers
//   rfmusb-test-app --model RFM95W --port /dev/ttyACM0 info
//   rfmusb-test-app --model RFM69HCW --port /dev/ttyACM0 get FREQUENCY
//   rfmusb-test-app --model RFM69HCW --port /dev/ttyACM0 set OUTPUT_POWER 0x0D
//   rfmusb-test-app --model RFM95W --port /dev/ttyACM0 flags
//   rfmusb-test-app --model RFM95W --port /dev/ttyACM0 send 48656C6C6F
//   rfmusb-test-app --model RFM95W --port /dev/ttyACM0 raw dv-fv
//   rfmusb-test-app --model RFM95W --mock info

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use rfmusb::registers::{RegisterInfo, catalog_for};
use rfmusb::{Family, RfmBuilder, RfmDevice, RfmModel, models};
use rfmusb_protocol::codec::{decode_bytes, encode_bytes};
use rfmusb_protocol::{Command as WireCommand, reply};
use rfmusb_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// rfmusb test application -- exercises a radio module from the command line.
#[derive(Parser)]
#[command(name = "rfmusb-test-app", version, about)]
struct Cli {
    /// Module model (RFM69HCW, RFM95W, RFM96W).
    /// Required for all commands except `list` and `ports`.
    #[arg(long)]
    model: Option<String>,

    /// Serial port path (e.g. /dev/ttyACM0, COM3).
    /// Required unless --mock is used.
    #[arg(long)]
    port: Option<String>,

    /// Override the default baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// Reply timeout in milliseconds.
    #[arg(long, default_value_t = 500)]
    timeout_ms: u64,

    /// Use a mock transport with canned identity replies instead of a real
    /// serial port. Useful for verifying CLI parsing and builder wiring
    /// without hardware.
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List supported models.
    List,

    /// List serial ports present on this host.
    Ports,

    /// List the registers available on --model.
    Registers,

    /// Print bridge identity and model details.
    Info,

    /// Read a register by name and print the raw value.
    Get {
        /// Register name (e.g. FREQUENCY) or mnemonic (e.g. rf-frq).
        register: String,
    },

    /// Write a raw wire value to a register.
    Set {
        /// Register name or mnemonic.
        register: String,
        /// Value exactly as sent on the wire (e.g. 0xE4C000, 1, AA55).
        value: String,
    },

    /// Print interrupt flags, DIO mask, and (RFM9x) modem status.
    Flags,

    /// Dump all radio registers.
    Dump,

    /// Show buffered I/O capacity and occupancy.
    Buffer,

    /// Transmit a packet given as hex bytes.
    Send {
        /// Payload as hex pairs, e.g. 48656C6C6F.
        hex: String,
    },

    /// Read received bytes from the staging buffer.
    Recv {
        /// Maximum number of bytes to read.
        #[arg(long, default_value_t = 64)]
        max: usize,
    },

    /// Reset the radio module.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Send an arbitrary command line and print the reply.
    Raw {
        /// Mnemonic followed by arguments.
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },

    /// Repeated firmware version queries with timing statistics.
    Stress {
        /// Number of queries.
        #[arg(long, default_value_t = 100)]
        count: u32,
    },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn format_mhz(hz: u32) -> String {
    format!("{:.3} MHz", hz as f64 / 1_000_000.0)
}

fn family_name(family: Family) -> &'static str {
    if family == Family::all() {
        "all"
    } else if family == Family::RFM69 {
        "RFM69"
    } else if family == Family::RFM9X {
        "RFM9x"
    } else {
        "-"
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    io::stdout().flush().ok();
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn lookup_model(cli: &Cli) -> Result<RfmModel> {
    let name = cli
        .model
        .as_deref()
        .context("--model is required for this command")?;
    models::model_by_name(name).with_context(|| {
        let known: Vec<_> = models::all_models().iter().map(|m| m.name).collect();
        format!("unknown model '{name}'. Supported: {}", known.join(", "))
    })
}

fn lookup_register(model: &RfmModel, name: &str) -> Result<RegisterInfo> {
    catalog_for(model.family)
        .into_iter()
        .find(|r| r.name.eq_ignore_ascii_case(name) || r.mnemonic == name)
        .with_context(|| format!("{} has no register '{name}'", model.name))
}

/// Mock transport preloaded with the replies `info` needs.
fn mock_transport() -> MockTransport {
    let mut mock = MockTransport::new();
    mock.expect_reply("dv-fv", "0.0.0-mock");
    mock.expect_reply("dv-sn", "MOCK0001");
    mock.expect_reply("bi-inf", "256 0");
    mock
}

async fn create_device(cli: &Cli) -> Result<RfmDevice> {
    let model = lookup_model(cli)?;
    let mut builder =
        RfmBuilder::new(model.clone()).read_timeout(Duration::from_millis(cli.timeout_ms));
    if let Some(baud) = cli.baud {
        builder = builder.baud_rate(baud);
    }

    if cli.mock {
        let device = builder
            .build_with_transport(Box::new(mock_transport()))
            .await
            .context("failed to build device with mock transport")?;
        println!("Connected (mock transport) -- {}", model.name);
        return Ok(device);
    }

    let port = cli
        .port
        .as_deref()
        .context("--port is required when not using --mock")?;
    let device = builder
        .serial_port(port)
        .verify_on_connect(true)
        .build()
        .await
        .with_context(|| format!("failed to connect to {} on {port}", model.name))?;
    println!("Connected -- {} on {port}", model.name);
    Ok(device)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_list() -> Result<()> {
    let entries = models::all_models();
    println!(
        "{:<10}  {:<6}  {:>5}  Frequency Coverage",
        "Model", "Family", "FIFO"
    );
    println!("{:<10}  {:<6}  {:>5}  ------------------", "-".repeat(10), "------", "-----");
    for m in &entries {
        println!(
            "{:<10}  {:<6}  {:>5}  {} - {}",
            m.name,
            family_name(m.family),
            m.fifo_size,
            format_mhz(m.frequency_range.min_hz),
            format_mhz(m.frequency_range.max_hz),
        );
    }
    println!();
    println!("{} models total.", entries.len());
    Ok(())
}

fn cmd_ports() -> Result<()> {
    let ports = rfmusb_transport::available_ports();
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

fn cmd_registers(model: &RfmModel) -> Result<()> {
    let registers = catalog_for(model.family);
    let name_width = registers.iter().map(|r| r.name.len()).max().unwrap_or(8);
    for r in &registers {
        println!(
            "{:<name_width$}  {:<7}  {:<10}  {:<6}  {}",
            r.name,
            r.mnemonic,
            format!("{:?}", r.access),
            family_name(r.families),
            r.value_type,
        );
    }
    println!();
    println!("{} registers on {}.", registers.len(), model.name);
    Ok(())
}

async fn cmd_info(device: &RfmDevice) -> Result<()> {
    let model = device.model();
    println!("Module");
    println!("  Model:          {}", model.name);
    println!("  Family:         {}", family_name(model.family));
    println!("  FIFO:           {} bytes", model.fifo_size);
    println!(
        "  Coverage:       {} - {}",
        format_mhz(model.frequency_range.min_hz),
        format_mhz(model.frequency_range.max_hz)
    );
    println!();
    println!("Bridge");
    println!("  Firmware:       {}", device.firmware_version().await?);
    println!("  Serial number:  {}", device.serial_number().await?);
    println!("  Buffer:         {}", device.buffered_io_info().await?);
    Ok(())
}

async fn cmd_get(device: &RfmDevice, register: &RegisterInfo) -> Result<()> {
    if !register.access.readable() {
        bail!("{} is write-only", register.name);
    }
    let command = WireCommand::new(register.mnemonic);
    let line = device.session().execute(&command).await?;
    if reply::is_error(&line) {
        return Err(reply::classify(&command, &line).into());
    }
    println!("{} = {line}", register.name);
    Ok(())
}

async fn cmd_set(device: &RfmDevice, register: &RegisterInfo, value: &str) -> Result<()> {
    if !register.access.writable() {
        bail!("{} is read-only", register.name);
    }
    let command = WireCommand::new(register.mnemonic).arg(value);
    device
        .session()
        .execute_with_check(&command, reply::OK)
        .await?;
    println!("{} set to {value}", register.name);
    Ok(())
}

async fn cmd_flags(device: &RfmDevice) -> Result<()> {
    if device.model().has_lora() {
        println!("IRQ flags:      {:?}", device.rfm9x_irq_flags().await?);
        println!("Modem status:   {:?}", device.modem_status().await?);
        println!("LoRa IRQ flags: {:?}", device.lora_irq_flags().await?);
        println!("LoRa IRQ mask:  {:?}", device.lora_irq_mask().await?);
    } else {
        println!("IRQ flags:      {:?}", device.rfm69_irq_flags().await?);
    }
    println!("DIO mask:       {:?}", device.dio_mask().await?);
    Ok(())
}

async fn cmd_dump(device: &RfmDevice) -> Result<()> {
    let dump = device.register_dump().await?;
    for (address, value) in &dump {
        println!("0x{address:02X}  0x{value:02X}");
    }
    println!("{} registers.", dump.len());
    Ok(())
}

async fn cmd_send(device: &RfmDevice, hex: &str) -> Result<()> {
    let data = decode_bytes(hex).context("payload must be hex pairs")?;
    device.transmit(&data).await?;
    println!("Transmitted {} bytes.", data.len());
    Ok(())
}

async fn cmd_recv(device: &RfmDevice, max: usize) -> Result<()> {
    let mut buf = vec![0u8; max];
    let n = device.receive(&mut buf).await?;
    if n == 0 {
        println!("Buffer empty.");
    } else {
        println!("{n} bytes: {}", encode_bytes(&buf[..n]));
    }
    Ok(())
}

async fn cmd_raw(device: &RfmDevice, words: &[String]) -> Result<()> {
    let (mnemonic, args) = words.split_first().context("missing mnemonic")?;
    let command = args
        .iter()
        .fold(WireCommand::new(mnemonic.as_str()), |cmd, a| cmd.arg(a.as_str()));
    for line in device.session().execute_list(&command).await? {
        println!("{line}");
    }
    Ok(())
}

async fn cmd_stress(device: &RfmDevice, count: u32) -> Result<()> {
    let mut latencies = Vec::with_capacity(count as usize);
    let mut failures = 0u32;
    for _ in 0..count {
        let start = Instant::now();
        match device.firmware_version().await {
            Ok(_) => latencies.push(start.elapsed()),
            Err(e) => {
                failures += 1;
                eprintln!("query failed: {e}");
            }
        }
    }

    if latencies.is_empty() {
        bail!("all {count} queries failed");
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    println!("Queries:   {count} ({failures} failed)");
    println!("Min:       {:?}", latencies[0]);
    println!("Median:    {:?}", latencies[latencies.len() / 2]);
    println!("Max:       {:?}", latencies[latencies.len() - 1]);
    println!("Mean:      {:?}", total / latencies.len() as u32);
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that need no connection.
    match &cli.command {
        Command::List => return cmd_list(),
        Command::Ports => return cmd_ports(),
        Command::Registers => return cmd_registers(&lookup_model(&cli)?),
        _ => {}
    }

    let device = create_device(&cli).await?;

    let result = match &cli.command {
        Command::Info => cmd_info(&device).await,
        Command::Get { register } => {
            let register = lookup_register(device.model(), register)?;
            cmd_get(&device, &register).await
        }
        Command::Set { register, value } => {
            let register = lookup_register(device.model(), register)?;
            cmd_set(&device, &register, value).await
        }
        Command::Flags => cmd_flags(&device).await,
        Command::Dump => cmd_dump(&device).await,
        Command::Buffer => {
            let info = device.buffered_io_info().await?;
            println!("{info} ({} free)", info.available());
            Ok(())
        }
        Command::Send { hex } => cmd_send(&device, hex).await,
        Command::Recv { max } => cmd_recv(&device, *max).await,
        Command::Reset { yes } => {
            if *yes || confirm("Reset the radio module?") {
                device.reset().await?;
                println!("Module reset.");
            }
            Ok(())
        }
        Command::Raw { words } => cmd_raw(&device, words).await,
        Command::Stress { count } => cmd_stress(&device, *count).await,
        Command::List | Command::Ports | Command::Registers => {
            unreachable!("handled before connecting")
        }
    };

    device.close().await.ok();
    result
}
