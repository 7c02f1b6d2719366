//! Print bridge identity and module status, then send one packet.
//!
//! Usage: cargo run --example link_check -- /dev/ttyACM0 rfm95w

use rfmusb::registers::base;
use rfmusb::{RfmBuilder, models};

#[tokio::main]
async fn main() -> rfmusb::Result<()> {
    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyACM0".to_string());
    let model_name = args.next().unwrap_or_else(|| "RFM95W".to_string());

    let Some(model) = models::model_by_name(&model_name) else {
        eprintln!("unknown model {model_name}");
        for m in models::all_models() {
            eprintln!("  {}", m.name);
        }
        return Ok(());
    };

    let radio = RfmBuilder::new(model)
        .serial_port(&port)
        .verify_on_connect(true)
        .build()
        .await?;

    println!("firmware: {}", radio.firmware_version().await?);
    println!("serial:   {}", radio.serial_number().await?);
    println!("mode:     {:?}", radio.get(&base::MODE).await?);
    println!("dio mask: {:?}", radio.dio_mask().await?);

    let info = radio.buffered_io_info().await?;
    println!("buffer:   {info}");

    if info.available() >= 5 {
        radio.transmit(b"hello").await?;
        println!("sent 5 bytes");
    }

    radio.close().await
}
