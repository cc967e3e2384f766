//! libusb host for the USB printer transport
//!
//! Supplies the [`transport::DeviceDirectory`] and
//! [`transport::ConnectionOpener`] implementations for `rusb` devices, plus
//! printer enumeration and `VID:PID` device filters.
//!
//! # Example
//!
//! ```no_run
//! use rusb_host::{DeviceSelector, RusbDirectory, RusbOpener, find_printer};
//! use transport::UsbTransport;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let context = rusb::Context::new()?;
//! let printer = find_printer(&context, &DeviceSelector::default())?;
//!
//! let mut transport = UsbTransport::open(&printer.device, &RusbDirectory, &RusbOpener)?;
//! transport.write(&[0x1B, 0x40])?;
//! let status = transport.read()?;
//! println!("{:02x?}", status);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod directory;
pub mod enumerate;
pub mod error;
pub mod filter;

pub use connection::{RusbConnection, RusbOpener, RusbRequest};
pub use directory::{RusbDirectory, read_interfaces};
pub use enumerate::{PrinterDevice, PrinterInfo, find_printer, list_printers};
pub use error::{HostError, Result};
pub use filter::{BusAddress, DeviceFilter, DeviceSelector};
