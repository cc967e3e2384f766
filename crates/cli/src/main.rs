//! escpos-usb
//!
//! Command-line front end for the USB printer transport: list attached
//! printers, send raw bytes to one, and read its responses.

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::CliConfig;
use logging::setup_logging;
use rusb_host::{
    BusAddress, DeviceFilter, DeviceSelector, RusbDirectory, RusbOpener, find_printer,
    list_printers,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use transport::UsbTransport;

#[derive(Parser, Debug)]
#[command(name = "escpos-usb")]
#[command(author, version, about = "Send raw bytes to USB receipt and label printers")]
#[command(long_about = "
Talks to USB printers through their printer-class interface. Bytes are sent
as-is; encode ESC/POS commands before piping them in.

EXAMPLES:
    # List attached printers
    escpos-usb list

    # Print a prepared job on the first printer found
    escpos-usb send receipt.bin

    # Pipe a job to a specific printer
    cat receipt.bin | escpos-usb --device 0x0416:0x5011 send -

    # Query status (DLE EOT 1) and read the answer
    printf '\\x10\\x04\\x01' | escpos-usb send - && escpos-usb read

CONFIGURATION:
    The tool looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/escpos-usb/config.toml
    3. /etc/escpos-usb/config.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Printer to use, as VID:PID (either half may be *)
    #[arg(short, long, value_name = "VID:PID")]
    device: Option<String>,

    /// Printer to use, as BUS:ADDRESS (overrides --device)
    #[arg(long, value_name = "BUS:ADDRESS")]
    bus_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List attached printers
    List,

    /// Send a file (or stdin with "-") to the printer
    Send {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Read responses from the printer and print them as hex
    Read {
        /// Number of reads to perform
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = CliConfig::default();
        let path = CliConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        CliConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        CliConfig::load_or_default()
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    // Resolve the selector before touching USB so bad input fails fast
    let selector = resolve_selector(&args, &config)?;
    debug!("Using printer selector: {}", selector);

    let context = rusb::Context::new().context("Failed to initialize libusb")?;

    match args.command.unwrap_or(Command::List) {
        Command::List => list_mode(&context, &selector),
        Command::Send { file } => send_mode(&context, &selector, &config, &file),
        Command::Read { count } => read_mode(&context, &selector, &config, count),
    }
}

/// Command line beats configuration; no choice means "any printer"
fn resolve_selector(args: &Args, config: &CliConfig) -> Result<DeviceSelector> {
    if let Some(target) = &args.bus_address {
        let target: BusAddress = target.parse()?;
        return Ok(DeviceSelector::BusAddress(target));
    }

    let filter = match &args.device {
        Some(filter) => Some(filter.parse::<DeviceFilter>()?),
        None => config.device_filter()?,
    };
    Ok(DeviceSelector::Filter(filter.unwrap_or_default()))
}

/// List printers matching the selector
fn list_mode(context: &rusb::Context, selector: &DeviceSelector) -> Result<()> {
    let printers = list_printers(context, &DeviceFilter::any())
        .context("Failed to enumerate USB devices")?;

    let printers: Vec<_> = printers
        .into_iter()
        .filter(|p| {
            selector.matches(
                p.info.bus_number,
                p.info.device_address,
                p.info.vendor_id,
                p.info.product_id,
            )
        })
        .collect();

    if printers.is_empty() {
        println!("No USB printers found.");
        return Ok(());
    }

    println!("Found {} USB printer(s):\n", printers.len());
    for printer in printers {
        let info = &printer.info;
        println!(
            "  {:04x}:{:04x} - {} {}",
            info.vendor_id,
            info.product_id,
            info.manufacturer.as_deref().unwrap_or("Unknown Manufacturer"),
            info.product.as_deref().unwrap_or("Unknown Product")
        );
        println!(
            "      Bus {:03} Device {:03} Interface {}",
            info.bus_number, info.device_address, info.interface_number
        );
        match (info.write_endpoint, info.read_endpoint) {
            (Some(write), Some(read)) => {
                println!("      Endpoints: write {:#04x}, read {:#04x}", write, read)
            }
            _ => println!("      Endpoints: incomplete, cannot be opened"),
        }
        if let Some(serial) = &info.serial_number {
            println!("      Serial: {}", serial);
        }
        println!();
    }

    Ok(())
}

fn open_transport(
    context: &rusb::Context,
    selector: &DeviceSelector,
    config: &CliConfig,
) -> Result<UsbTransport<rusb_host::RusbConnection<rusb::Context>>> {
    let printer = find_printer(context, selector)?;
    info!(
        "Using printer {:04x}:{:04x} on bus {:03} device {:03}",
        printer.info.vendor_id,
        printer.info.product_id,
        printer.info.bus_number,
        printer.info.device_address
    );

    UsbTransport::open_with_config(
        &printer.device,
        &RusbDirectory,
        &RusbOpener,
        config.transport.clone(),
    )
    .context("Failed to open printer")
}

/// Send a file or stdin to the printer
fn send_mode(
    context: &rusb::Context,
    selector: &DeviceSelector,
    config: &CliConfig,
    file: &Path,
) -> Result<()> {
    let data = if file.as_os_str() == "-" {
        let mut data = Vec::new();
        std::io::stdin()
            .read_to_end(&mut data)
            .context("Failed to read stdin")?;
        data
    } else {
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?
    };

    let mut transport = open_transport(context, selector, config)?;
    for (index, chunk) in data.chunks(config.output.chunk_size).enumerate() {
        transport
            .write(chunk)
            .with_context(|| format!("Failed to write chunk {}", index))?;
    }
    transport.flush()?;
    transport.close();

    info!("Sent {} bytes", data.len());
    Ok(())
}

/// Read responses and print them as hex
fn read_mode(
    context: &rusb::Context,
    selector: &DeviceSelector,
    config: &CliConfig,
    count: u32,
) -> Result<()> {
    let mut transport = open_transport(context, selector, config)?;

    for _ in 0..count {
        let response = transport.read().context("Failed to read from printer")?;
        if response.is_empty() {
            println!("(no data)");
        } else {
            println!("{}", format_hex(&response));
        }
    }

    transport.close();
    Ok(())
}

fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("escpos-usb").chain(argv.iter().copied()))
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x12, 0x00, 0xff]), "12 00 ff");
        assert_eq!(format_hex(&[]), "");
    }

    #[test]
    fn test_selector_defaults_to_any() {
        let selector = resolve_selector(&args(&["list"]), &CliConfig::default()).unwrap();
        assert_eq!(selector, DeviceSelector::Filter(DeviceFilter::any()));
    }

    #[test]
    fn test_selector_from_config() {
        let mut config = CliConfig::default();
        config.device.filter = Some("0x04b8:*".to_string());

        let selector = resolve_selector(&args(&["list"]), &config).unwrap();
        assert_eq!(
            selector,
            DeviceSelector::Filter(DeviceFilter {
                vendor_id: Some(0x04b8),
                product_id: None
            })
        );
    }

    #[test]
    fn test_command_line_overrides_config() {
        let mut config = CliConfig::default();
        config.device.filter = Some("0x04b8:*".to_string());

        let selector =
            resolve_selector(&args(&["--device", "0x0416:0x5011", "list"]), &config).unwrap();
        assert_eq!(
            selector,
            DeviceSelector::Filter(DeviceFilter::new(0x0416, 0x5011))
        );

        let selector = resolve_selector(
            &args(&["--device", "0x0416:0x5011", "--bus-address", "2:9", "list"]),
            &config,
        )
        .unwrap();
        assert_eq!(
            selector,
            DeviceSelector::BusAddress(BusAddress { bus: 2, address: 9 })
        );
    }

    #[test]
    fn test_invalid_selector() {
        let config = CliConfig::default();
        assert!(resolve_selector(&args(&["--device", "nope", "list"]), &config).is_err());
        assert!(resolve_selector(&args(&["--bus-address", "x", "list"]), &config).is_err());
    }

    #[test]
    fn test_parse_read_count() {
        match args(&["read", "-n", "3"]).command {
            Some(Command::Read { count }) => assert_eq!(count, 3),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
