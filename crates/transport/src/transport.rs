//! USB printer transport
//!
//! Turns a device into a blocking duplex byte channel. Construction resolves
//! the printer interface and its two bulk endpoints and then opens the
//! connection; every later call reuses that connection until `close`.

use crate::config::TransportConfig;
use crate::connection::{Connection, ConnectionOpener, DeviceDirectory, PendingRequest};
use crate::descriptor::{Direction, EndpointDescriptor, InterfaceDescriptor};
use crate::error::{Result, TransportError};
use crate::stream::PrinterStream;
use tracing::{debug, info, warn};

/// Everything a live transport holds. Present together or not at all.
struct OpenState<C> {
    interface: InterfaceDescriptor,
    /// Host-to-device bulk endpoint
    write_endpoint: EndpointDescriptor,
    /// Device-to-host bulk endpoint
    read_endpoint: EndpointDescriptor,
    connection: C,
}

enum State<C> {
    Open(OpenState<C>),
    Closed,
}

/// Blocking byte transport to a USB printer
///
/// Not internally synchronized: every operation takes `&mut self`, so sharing
/// one transport between threads needs an external lock.
///
/// `write` has no timeout of its own and blocks until the device accepts the
/// data. `read` waits at most [`TransportConfig::read_timeout`].
pub struct UsbTransport<C: Connection> {
    state: State<C>,
    config: TransportConfig,
}

impl<C: Connection> UsbTransport<C> {
    /// Open a transport with default tuning
    pub fn open<D, R, O>(device: &D, directory: &R, opener: &O) -> Result<Self>
    where
        D: ?Sized,
        R: DeviceDirectory<D> + ?Sized,
        O: ConnectionOpener<D, Connection = C> + ?Sized,
    {
        Self::open_with_config(device, directory, opener, TransportConfig::default())
    }

    /// Open a transport
    ///
    /// Checks `config`, resolves the printer interface, the write endpoint
    /// and the read endpoint, then opens the connection. Nothing is held on
    /// failure.
    pub fn open_with_config<D, R, O>(
        device: &D,
        directory: &R,
        opener: &O,
        config: TransportConfig,
    ) -> Result<Self>
    where
        D: ?Sized,
        R: DeviceDirectory<D> + ?Sized,
        O: ConnectionOpener<D, Connection = C> + ?Sized,
    {
        config.validate()?;

        let interface = directory
            .find_printer_interface(device)
            .ok_or(TransportError::InterfaceNotFound)?;

        let write_endpoint = directory.find_write_endpoint(&interface).ok_or(
            TransportError::EndpointNotFound {
                direction: Direction::HostToDevice,
                interface: interface.number,
            },
        )?;

        let read_endpoint = directory.find_read_endpoint(&interface).ok_or(
            TransportError::EndpointNotFound {
                direction: Direction::DeviceToHost,
                interface: interface.number,
            },
        )?;

        let connection = opener.open(device).map_err(|e| {
            warn!("Failed to open USB connection: {}", e);
            TransportError::ConnectionFailed(e)
        })?;

        info!(
            "Opened USB printer transport: interface={}, write_endpoint={:#04x}, read_endpoint={:#04x}",
            interface.number, write_endpoint.address, read_endpoint.address
        );

        Ok(Self {
            state: State::Open(OpenState {
                interface,
                write_endpoint,
                read_endpoint,
                connection,
            }),
            config,
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Selected printer interface, `None` once closed
    pub fn interface(&self) -> Option<&InterfaceDescriptor> {
        match &self.state {
            State::Open(open) => Some(&open.interface),
            State::Closed => None,
        }
    }

    /// Host-to-device endpoint, `None` once closed
    pub fn write_endpoint(&self) -> Option<&EndpointDescriptor> {
        match &self.state {
            State::Open(open) => Some(&open.write_endpoint),
            State::Closed => None,
        }
    }

    /// Device-to-host endpoint, `None` once closed
    pub fn read_endpoint(&self) -> Option<&EndpointDescriptor> {
        match &self.state {
            State::Open(open) => Some(&open.read_endpoint),
            State::Closed => None,
        }
    }

    fn open_state(&mut self) -> Result<&mut OpenState<C>> {
        match &mut self.state {
            State::Open(open) => Ok(open),
            State::Closed => Err(TransportError::NotConnected),
        }
    }

    /// Write `length` bytes of `bytes` starting at `offset`
    ///
    /// The interface is claimed again before every write. On failure the
    /// number of bytes that reached the device is unknown.
    pub fn write_range(&mut self, bytes: &[u8], offset: usize, length: usize) -> Result<()> {
        let force = self.config.force_claim;
        let open = self.open_state()?;

        let data = offset
            .checked_add(length)
            .and_then(|end| bytes.get(offset..end))
            .ok_or(TransportError::InvalidRange {
                offset,
                length,
                len: bytes.len(),
            })?;

        let interface = open.interface.number;
        open.connection
            .claim_interface(&open.interface, force)
            .map_err(|source| {
                warn!("Failed to claim interface {}: {}", interface, source);
                TransportError::ClaimFailed { interface, source }
            })?;

        let endpoint = open.write_endpoint.address;
        let mut request = PendingRequest::initialize(&mut open.connection, &open.write_endpoint)
            .map_err(|source| TransportError::TransferQueueFailed { endpoint, source })?;

        request
            .queue(data)
            .map_err(|source| TransportError::TransferQueueFailed { endpoint, source })?;

        request
            .wait()
            .map_err(|source| TransportError::TransferFailed { endpoint, source })?;

        debug!("Wrote {} bytes to endpoint {:#04x}", data.len(), endpoint);
        Ok(())
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_range(bytes, 0, bytes.len())
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte])
    }

    /// Read one response from the device
    ///
    /// Performs a single bulk IN transfer. Returns exactly the bytes
    /// received, or an empty vector if nothing arrived before the timeout.
    pub fn read(&mut self) -> Result<Vec<u8>> {
        let buffer_size = self.config.read_buffer_size;
        let timeout = self.config.read_timeout;
        let open = self.open_state()?;
        let endpoint = open.read_endpoint.address;

        let mut buffer = vec![0u8; buffer_size];
        match open
            .connection
            .bulk_transfer(&open.read_endpoint, &mut buffer, timeout)
        {
            Ok(0) => {
                debug!("Bulk IN on endpoint {:#04x}: no data", endpoint);
                Ok(Vec::new())
            }
            Ok(received) => {
                buffer.truncate(received.min(buffer_size));
                debug!(
                    "Bulk IN on endpoint {:#04x}: {} bytes",
                    endpoint,
                    buffer.len()
                );
                Ok(buffer)
            }
            Err(e) => {
                // Timeout or no pending status data
                debug!(
                    "Bulk IN on endpoint {:#04x} returned no data: {}",
                    endpoint, e
                );
                Ok(Vec::new())
            }
        }
    }

    /// Nothing is buffered
    pub fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the connection. Later calls fail with `NotConnected`.
    pub fn close(&mut self) {
        if let State::Open(open) = std::mem::replace(&mut self.state, State::Closed) {
            let OpenState {
                interface,
                connection,
                ..
            } = open;
            connection.close();
            info!(
                "Closed USB printer transport on interface {}",
                interface.number
            );
        }
    }
}

impl<C: Connection> Drop for UsbTransport<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connection> PrinterStream for UsbTransport<C> {
    fn write_range(&mut self, bytes: &[u8], offset: usize, length: usize) -> Result<()> {
        UsbTransport::write_range(self, bytes, offset, length)
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        UsbTransport::read(self)
    }

    fn flush(&mut self) -> Result<()> {
        UsbTransport::flush(self)
    }

    fn close(&mut self) {
        UsbTransport::close(self)
    }
}

impl<C: Connection> std::io::Write for UsbTransport<C> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        UsbTransport::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        UsbTransport::flush(self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockDevice, MockDirectory, MockEvent, MockOpener};
    use std::io::Write;

    #[test]
    fn test_open_exposes_descriptors() {
        let device = MockDevice::printer(0x01, 0x82);
        let opener = MockOpener::new();
        let transport = UsbTransport::open(&device, &MockDirectory, &opener).unwrap();

        assert!(transport.is_open());
        assert_eq!(transport.interface().map(|i| i.number), Some(0));
        assert_eq!(transport.write_endpoint().map(|e| e.address), Some(0x01));
        assert_eq!(transport.read_endpoint().map(|e| e.address), Some(0x82));
    }

    #[test]
    fn test_close_clears_all_state() {
        let device = MockDevice::printer(0x01, 0x82);
        let opener = MockOpener::new();
        let mut transport = UsbTransport::open(&device, &MockDirectory, &opener).unwrap();

        transport.close();
        assert!(!transport.is_open());
        assert!(transport.interface().is_none());
        assert!(transport.write_endpoint().is_none());
        assert!(transport.read_endpoint().is_none());
    }

    #[test]
    fn test_drop_closes_connection() {
        let device = MockDevice::printer(0x01, 0x82);
        let opener = MockOpener::new();
        {
            let _transport = UsbTransport::open(&device, &MockDirectory, &opener).unwrap();
        }
        assert_eq!(opener.count(|e| *e == MockEvent::Closed), 1);
    }

    #[test]
    fn test_io_write_reports_full_length() {
        let device = MockDevice::printer(0x01, 0x82);
        let opener = MockOpener::new();
        let mut transport = UsbTransport::open(&device, &MockDirectory, &opener).unwrap();

        let written = Write::write(&mut transport, b"hello").unwrap();
        assert_eq!(written, 5);
        assert_eq!(opener.queued_payloads(), vec![b"hello".to_vec()]);

        transport.close();
        let err = Write::write(&mut transport, b"x").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_read_uses_configured_buffer_and_timeout() {
        let device = MockDevice::printer(0x01, 0x82);
        let opener = MockOpener::new();
        let config = TransportConfig {
            read_buffer_size: 16,
            read_timeout: std::time::Duration::from_millis(100),
            force_claim: true,
        };
        let mut transport =
            UsbTransport::open_with_config(&device, &MockDirectory, &opener, config).unwrap();

        assert!(transport.read().unwrap().is_empty());
        assert!(opener.events().contains(&MockEvent::BulkTransfer {
            endpoint: 0x82,
            capacity: 16,
            timeout_ms: 100,
        }));
    }
}
