//! Collaborator contracts
//!
//! The transport never touches a USB stack directly. It is handed a
//! [`DeviceDirectory`] to resolve descriptors and a [`ConnectionOpener`] to
//! obtain an exclusive [`Connection`]. Backends (libusb, test doubles)
//! implement these traits.

use crate::descriptor::{Direction, EndpointDescriptor, InterfaceDescriptor};
use crate::error::BackendError;
use std::time::Duration;

/// Resolves the printer interface and its endpoints for a device
pub trait DeviceDirectory<D: ?Sized> {
    /// First printer-class interface of the device, if any
    fn find_printer_interface(&self, device: &D) -> Option<InterfaceDescriptor>;

    /// Host-to-device bulk endpoint used for writes
    fn find_write_endpoint(&self, interface: &InterfaceDescriptor) -> Option<EndpointDescriptor> {
        interface.bulk_endpoint(Direction::HostToDevice)
    }

    /// Device-to-host bulk endpoint used for reads
    fn find_read_endpoint(&self, interface: &InterfaceDescriptor) -> Option<EndpointDescriptor> {
        interface.bulk_endpoint(Direction::DeviceToHost)
    }
}

/// Opens an exclusive low-level connection to a device
pub trait ConnectionOpener<D: ?Sized> {
    type Connection: Connection;

    fn open(&self, device: &D) -> Result<Self::Connection, BackendError>;
}

/// Low-level exclusive connection to a device
pub trait Connection {
    /// Backend handle for one asynchronous request
    type Request;

    /// Claim an interface; `force` takes it from any other driver holding it
    fn claim_interface(
        &mut self,
        interface: &InterfaceDescriptor,
        force: bool,
    ) -> Result<(), BackendError>;

    /// Allocate a request bound to an endpoint
    fn initialize_request(
        &mut self,
        endpoint: &EndpointDescriptor,
    ) -> Result<Self::Request, BackendError>;

    /// Queue `data` on a request; completes asynchronously
    fn queue_request(
        &mut self,
        request: &mut Self::Request,
        data: &[u8],
    ) -> Result<(), BackendError>;

    /// Block until an outstanding request completes. May complete every
    /// outstanding request, not only the latest.
    fn request_wait(&mut self) -> Result<(), BackendError>;

    /// Release a request, cancelling it if still outstanding
    fn close_request(&mut self, request: Self::Request);

    /// Synchronous bulk transfer into `buffer`, returning bytes received
    fn bulk_transfer(
        &mut self,
        endpoint: &EndpointDescriptor,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, BackendError>;

    /// Release the connection
    fn close(self);
}

/// Scoped asynchronous request
///
/// The request is handed back to [`Connection::close_request`] when the guard
/// drops, whichever way the write exits.
pub(crate) struct PendingRequest<'c, C: Connection> {
    connection: &'c mut C,
    request: Option<C::Request>,
}

impl<'c, C: Connection> PendingRequest<'c, C> {
    pub(crate) fn initialize(
        connection: &'c mut C,
        endpoint: &EndpointDescriptor,
    ) -> Result<Self, BackendError> {
        let request = connection.initialize_request(endpoint)?;
        Ok(Self {
            connection,
            request: Some(request),
        })
    }

    pub(crate) fn queue(&mut self, data: &[u8]) -> Result<(), BackendError> {
        match self.request.as_mut() {
            Some(request) => self.connection.queue_request(request, data),
            None => Err("request already released".into()),
        }
    }

    pub(crate) fn wait(&mut self) -> Result<(), BackendError> {
        self.connection.request_wait()
    }
}

impl<C: Connection> Drop for PendingRequest<'_, C> {
    fn drop(&mut self) {
        if let Some(request) = self.request.take() {
            self.connection.close_request(request);
        }
    }
}
