//! USB descriptor model
//!
//! The subset of interface and endpoint descriptors the transport needs to
//! pick a printer interface and its two bulk endpoints. Backends translate
//! their native descriptors into these types.

use serde::{Deserialize, Serialize};

/// USB class code for printers (USB Printer Class 1.1)
pub const PRINTER_CLASS: u8 = 0x07;

/// Direction of an endpoint, seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Host to device (USB OUT). Used for writes.
    HostToDevice,
    /// Device to host (USB IN). Used for reads.
    DeviceToHost,
}

impl Direction {
    /// Direction encoded in bit 7 of an endpoint address
    pub fn from_address(address: u8) -> Self {
        if address & 0x80 != 0 {
            Direction::DeviceToHost
        } else {
            Direction::HostToDevice
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::HostToDevice => write!(f, "host-to-device"),
            Direction::DeviceToHost => write!(f, "device-to-host"),
        }
    }
}

/// USB transfer type of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// A single endpoint of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Endpoint address including the direction bit
    pub address: u8,
    pub direction: Direction,
    pub transfer_kind: TransferKind,
    pub max_packet_size: u16,
}

impl EndpointDescriptor {
    /// Bulk endpoint with the direction taken from the address
    pub fn bulk(address: u8, max_packet_size: u16) -> Self {
        Self {
            address,
            direction: Direction::from_address(address),
            transfer_kind: TransferKind::Bulk,
            max_packet_size,
        }
    }

    pub fn is_bulk(&self) -> bool {
        self.transfer_kind == TransferKind::Bulk
    }
}

/// One interface (alternate setting) of a device configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub number: u8,
    pub alternate_setting: u8,
    pub class_code: u8,
    pub sub_class_code: u8,
    pub protocol_code: u8,
    /// Endpoints in descriptor order
    pub endpoints: Vec<EndpointDescriptor>,
}

impl InterfaceDescriptor {
    /// Whether this interface belongs to the printer class
    pub fn is_printer(&self) -> bool {
        self.class_code == PRINTER_CLASS
    }

    /// First bulk endpoint with the given direction
    pub fn bulk_endpoint(&self, direction: Direction) -> Option<EndpointDescriptor> {
        self.endpoints
            .iter()
            .find(|ep| ep.is_bulk() && ep.direction == direction)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface(endpoints: Vec<EndpointDescriptor>) -> InterfaceDescriptor {
        InterfaceDescriptor {
            number: 0,
            alternate_setting: 0,
            class_code: PRINTER_CLASS,
            sub_class_code: 0x01,
            protocol_code: 0x02,
            endpoints,
        }
    }

    #[test]
    fn test_direction_from_address() {
        assert_eq!(Direction::from_address(0x81), Direction::DeviceToHost);
        assert_eq!(Direction::from_address(0x01), Direction::HostToDevice);
        assert_eq!(Direction::from_address(0x02), Direction::HostToDevice);
    }

    #[test]
    fn test_bulk_endpoint_skips_interrupt() {
        let iface = interface(vec![
            EndpointDescriptor {
                address: 0x83,
                direction: Direction::DeviceToHost,
                transfer_kind: TransferKind::Interrupt,
                max_packet_size: 8,
            },
            EndpointDescriptor::bulk(0x81, 64),
            EndpointDescriptor::bulk(0x02, 64),
        ]);

        assert_eq!(
            iface.bulk_endpoint(Direction::DeviceToHost).map(|ep| ep.address),
            Some(0x81)
        );
        assert_eq!(
            iface.bulk_endpoint(Direction::HostToDevice).map(|ep| ep.address),
            Some(0x02)
        );
    }

    #[test]
    fn test_bulk_endpoint_first_match_wins() {
        let iface = interface(vec![
            EndpointDescriptor::bulk(0x01, 64),
            EndpointDescriptor::bulk(0x03, 512),
        ]);
        assert_eq!(
            iface.bulk_endpoint(Direction::HostToDevice).map(|ep| ep.address),
            Some(0x01)
        );
        assert!(iface.bulk_endpoint(Direction::DeviceToHost).is_none());
    }

    #[test]
    fn test_is_printer() {
        let mut iface = interface(Vec::new());
        assert!(iface.is_printer());
        iface.class_code = 0x03;
        assert!(!iface.is_printer());
    }
}
