//! USB printer transport
//!
//! This crate turns a USB device into a blocking, byte-oriented duplex
//! channel for receipt and label printers. It locates the printer-class
//! interface and its bulk endpoints, opens an exclusive connection and moves
//! opaque bytes; command encoding (ESC/POS) lives above it.
//!
//! The USB stack itself is supplied by the caller through the
//! [`DeviceDirectory`] and [`ConnectionOpener`] traits.
//!
//! # Example
//!
//! ```
//! use transport::{TransportError, UsbTransport};
//! use transport::test_utils::{MockDevice, MockDirectory, MockOpener};
//!
//! let device = MockDevice::printer(0x01, 0x82);
//! let opener = MockOpener::new();
//!
//! let mut printer = UsbTransport::open(&device, &MockDirectory, &opener).unwrap();
//! printer.write(&[0x1B, 0x40]).unwrap();
//! printer.close();
//!
//! assert!(matches!(printer.write(&[0x0A]), Err(TransportError::NotConnected)));
//! ```

pub mod config;
pub mod connection;
pub mod descriptor;
pub mod error;
pub mod stream;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transport;

pub use config::{DEFAULT_READ_BUFFER_SIZE, DEFAULT_READ_TIMEOUT, TransportConfig};
pub use connection::{Connection, ConnectionOpener, DeviceDirectory};
pub use descriptor::{
    Direction, EndpointDescriptor, InterfaceDescriptor, PRINTER_CLASS, TransferKind,
};
pub use error::{BackendError, Result, TransportError};
pub use stream::PrinterStream;
pub use transport::UsbTransport;
