//! Transport error types

use crate::descriptor::Direction;
use thiserror::Error;

/// Error reported by a backend (device directory, opener or connection)
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`UsbTransport`](crate::UsbTransport)
///
/// None of these are retried by the transport itself.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device has no printer-class interface
    #[error("Unable to find USB printer interface")]
    InterfaceNotFound,

    /// The printer interface lacks a bulk endpoint in the given direction
    #[error("Unable to find {direction} bulk endpoint on interface {interface}")]
    EndpointNotFound { direction: Direction, interface: u8 },

    /// The device could not be opened (permission, busy, disconnected)
    #[error("Unable to open USB connection: {0}")]
    ConnectionFailed(#[source] BackendError),

    /// The transport is closed
    #[error("Unable to connect to USB device: transport is closed")]
    NotConnected,

    /// The interface claim was refused
    #[error("Error during claim of USB interface {interface}: {source}")]
    ClaimFailed {
        interface: u8,
        #[source]
        source: BackendError,
    },

    /// The asynchronous request could not be set up or queued
    #[error("Error queueing USB request on endpoint {endpoint:#04x}: {source}")]
    TransferQueueFailed {
        endpoint: u8,
        #[source]
        source: BackendError,
    },

    /// Waiting for a queued request reported an error
    #[error("USB request on endpoint {endpoint:#04x} failed: {source}")]
    TransferFailed {
        endpoint: u8,
        #[source]
        source: BackendError,
    },

    /// The requested write range lies outside the buffer
    #[error("Write range out of bounds: offset {offset} + length {length} > {len}")]
    InvalidRange {
        offset: usize,
        length: usize,
        len: usize,
    },

    /// Tuning values the transport cannot work with
    #[error("Invalid transport configuration: {0}")]
    InvalidConfig(String),
}

/// Type alias for transport results
pub type Result<T> = std::result::Result<T, TransportError>;

impl From<TransportError> for std::io::Error {
    fn from(err: TransportError) -> Self {
        use std::io::ErrorKind;

        let kind = match &err {
            TransportError::NotConnected => ErrorKind::NotConnected,
            TransportError::InvalidRange { .. } | TransportError::InvalidConfig(_) => {
                ErrorKind::InvalidInput
            }
            TransportError::InterfaceNotFound | TransportError::EndpointNotFound { .. } => {
                ErrorKind::NotFound
            }
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::EndpointNotFound {
            direction: Direction::DeviceToHost,
            interface: 2,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("device-to-host"));
        assert!(msg.contains("interface 2"));

        let err = TransportError::TransferQueueFailed {
            endpoint: 0x01,
            source: "queue full".into(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("0x01"));
        assert!(msg.contains("queue full"));
    }

    #[test]
    fn test_io_error_kind() {
        let io: std::io::Error = TransportError::NotConnected.into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotConnected);

        let io: std::io::Error = TransportError::InvalidRange {
            offset: 4,
            length: 4,
            len: 6,
        }
        .into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);

        let io: std::io::Error =
            TransportError::InvalidConfig("read_buffer_size must be greater than 0".into()).into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);

        let io: std::io::Error = TransportError::InterfaceNotFound.into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
