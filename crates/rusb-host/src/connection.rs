//! libusb connection
//!
//! libusb's synchronous API has no request objects, so queued requests are
//! kept in FIFO order and carried out as blocking bulk OUT transfers when
//! the transport waits on them.

use rusb::{Device, DeviceHandle, UsbContext};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};
use transport::{
    BackendError, Connection, ConnectionOpener, Direction, EndpointDescriptor, InterfaceDescriptor,
};

/// libusb treats a zero timeout as "wait forever"
const NO_TIMEOUT: Duration = Duration::ZERO;

/// [`ConnectionOpener`] for `rusb` devices
#[derive(Debug, Clone, Copy, Default)]
pub struct RusbOpener;

impl<T: UsbContext> ConnectionOpener<Device<T>> for RusbOpener {
    type Connection = RusbConnection<T>;

    fn open(&self, device: &Device<T>) -> Result<RusbConnection<T>, BackendError> {
        let handle = device.open().map_err(|e| {
            warn!(
                "Failed to open bus {:03} device {:03}: {}",
                device.bus_number(),
                device.address(),
                e
            );
            e
        })?;

        debug!(
            "Opened bus {:03} device {:03}",
            device.bus_number(),
            device.address()
        );
        Ok(RusbConnection::new(handle))
    }
}

/// Request handle for [`RusbConnection`]
#[derive(Debug)]
pub struct RusbRequest {
    id: u64,
    endpoint: u8,
}

/// Data waiting for `request_wait`
#[derive(Debug)]
struct QueuedTransfer {
    id: u64,
    endpoint: u8,
    data: Vec<u8>,
}

/// Bulk OUT transfers queued on one handle, oldest first
#[derive(Debug)]
struct TransferQueue {
    queued: VecDeque<QueuedTransfer>,
    next_id: u64,
}

impl TransferQueue {
    fn new() -> Self {
        Self {
            queued: VecDeque::new(),
            next_id: 1,
        }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn push(&mut self, id: u64, endpoint: u8, data: &[u8]) {
        self.queued.push_back(QueuedTransfer {
            id,
            endpoint,
            data: data.to_vec(),
        });
    }

    /// Drop a transfer that has not been sent yet
    fn cancel(&mut self, id: u64) -> bool {
        let before = self.queued.len();
        self.queued.retain(|transfer| transfer.id != id);
        self.queued.len() != before
    }

    /// Send every queued transfer in order, stopping at the first failure.
    /// The failed transfer is dropped; later ones stay queued.
    fn drain<E>(&mut self, mut send: impl FnMut(u8, &[u8]) -> Result<(), E>) -> Result<(), E> {
        while let Some(transfer) = self.queued.pop_front() {
            debug!(
                "Bulk OUT: endpoint={:#04x}, data_len={}",
                transfer.endpoint,
                transfer.data.len()
            );
            send(transfer.endpoint, &transfer.data)?;
        }
        Ok(())
    }
}

/// Feed `data` to `write` until every byte is accepted
fn write_fully(
    data: &[u8],
    mut write: impl FnMut(&[u8]) -> Result<usize, rusb::Error>,
) -> Result<(), rusb::Error> {
    let mut offset = 0;
    while offset < data.len() {
        let written = write(&data[offset..])?;
        if written == 0 {
            return Err(rusb::Error::Io);
        }
        offset += written;
    }
    Ok(())
}

/// Open libusb device handle
pub struct RusbConnection<T: UsbContext> {
    handle: DeviceHandle<T>,
    /// Interfaces claimed by us
    claimed_interfaces: Vec<u8>,
    /// Interfaces whose kernel driver we detached
    detached_interfaces: Vec<u8>,
    transfers: TransferQueue,
}

impl<T: UsbContext> RusbConnection<T> {
    pub fn new(handle: DeviceHandle<T>) -> Self {
        Self {
            handle,
            claimed_interfaces: Vec::new(),
            detached_interfaces: Vec::new(),
            transfers: TransferQueue::new(),
        }
    }

    /// Detach the kernel driver (usblp on Linux) if it holds the interface
    fn detach_kernel_driver(&mut self, interface: u8) {
        match self.handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!("Detaching kernel driver from interface {}", interface);
                match self.handle.detach_kernel_driver(interface) {
                    Ok(()) => {
                        if !self.detached_interfaces.contains(&interface) {
                            self.detached_interfaces.push(interface);
                        }
                    }
                    // Claiming will most likely fail next and report it
                    Err(e) => warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        interface, e
                    ),
                }
            }
            Ok(false) => {}
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
            }
        }
    }
}

impl<T: UsbContext> Connection for RusbConnection<T> {
    type Request = RusbRequest;

    fn claim_interface(
        &mut self,
        interface: &InterfaceDescriptor,
        force: bool,
    ) -> Result<(), BackendError> {
        let number = interface.number;
        if force {
            self.detach_kernel_driver(number);
        }

        self.handle.claim_interface(number)?;
        if !self.claimed_interfaces.contains(&number) {
            self.claimed_interfaces.push(number);
        }

        if interface.alternate_setting != 0 {
            self.handle
                .set_alternate_setting(number, interface.alternate_setting)?;
        }

        debug!("Claimed interface {}", number);
        Ok(())
    }

    fn initialize_request(
        &mut self,
        endpoint: &EndpointDescriptor,
    ) -> Result<RusbRequest, BackendError> {
        // Requests only carry writes
        if endpoint.direction != Direction::HostToDevice {
            return Err(rusb::Error::InvalidParam.into());
        }

        Ok(RusbRequest {
            id: self.transfers.allocate(),
            endpoint: endpoint.address,
        })
    }

    fn queue_request(
        &mut self,
        request: &mut RusbRequest,
        data: &[u8],
    ) -> Result<(), BackendError> {
        self.transfers.push(request.id, request.endpoint, data);
        Ok(())
    }

    /// Blocking bulk OUT of everything queued, with no timeout
    fn request_wait(&mut self) -> Result<(), BackendError> {
        let handle = &self.handle;
        self.transfers.drain(|endpoint, data| {
            write_fully(data, |chunk| handle.write_bulk(endpoint, chunk, NO_TIMEOUT))
        })?;
        Ok(())
    }

    fn close_request(&mut self, request: RusbRequest) {
        if self.transfers.cancel(request.id) {
            debug!("Cancelled request {} before it was sent", request.id);
        }
    }

    fn bulk_transfer(
        &mut self,
        endpoint: &EndpointDescriptor,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, BackendError> {
        Ok(self.handle.read_bulk(endpoint.address, buffer, timeout)?)
    }

    /// Release claimed interfaces and hand detached ones back to the kernel
    fn close(mut self) {
        for interface in std::mem::take(&mut self.claimed_interfaces) {
            if let Err(e) = self.handle.release_interface(interface) {
                warn!("Failed to release interface {}: {}", interface, e);
            }
        }

        for interface in std::mem::take(&mut self.detached_interfaces) {
            if let Err(e) = self.handle.attach_kernel_driver(interface) {
                debug!(
                    "Could not reattach kernel driver to interface {}: {}",
                    interface, e
                );
            } else {
                debug!("Reattached kernel driver to interface {}", interface);
            }
        }

        debug!("Closed USB device handle");
    }
}
