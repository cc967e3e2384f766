//! Descriptor lookup backed by libusb
//!
//! Reads the configuration descriptor of a `rusb::Device` and translates it
//! into the transport's descriptor model.

use rusb::{ConfigDescriptor, Device, UsbContext};
use tracing::{debug, warn};
use transport::{DeviceDirectory, Direction, EndpointDescriptor, InterfaceDescriptor, TransferKind};

/// [`DeviceDirectory`] for `rusb` devices
#[derive(Debug, Clone, Copy, Default)]
pub struct RusbDirectory;

impl<T: UsbContext> DeviceDirectory<Device<T>> for RusbDirectory {
    fn find_printer_interface(&self, device: &Device<T>) -> Option<InterfaceDescriptor> {
        let interfaces = match read_interfaces(device) {
            Ok(interfaces) => interfaces,
            Err(e) => {
                warn!(
                    "Failed to read config descriptor of bus {:03} device {:03}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                return None;
            }
        };

        let found = interfaces.into_iter().find(|i| i.is_printer());
        if let Some(interface) = &found {
            debug!(
                "Printer interface {} (alt {}) on bus {:03} device {:03}",
                interface.number,
                interface.alternate_setting,
                device.bus_number(),
                device.address()
            );
        }
        found
    }
}

/// All interface alternate settings of the device's configuration
///
/// Uses the active configuration, falling back to the first one when the
/// device is unconfigured.
pub fn read_interfaces<T: UsbContext>(
    device: &Device<T>,
) -> Result<Vec<InterfaceDescriptor>, rusb::Error> {
    let config = device
        .active_config_descriptor()
        .or_else(|_| device.config_descriptor(0))?;
    Ok(map_config(&config))
}

fn map_config(config: &ConfigDescriptor) -> Vec<InterfaceDescriptor> {
    let mut interfaces = Vec::new();
    for interface in config.interfaces() {
        for descriptor in interface.descriptors() {
            interfaces.push(InterfaceDescriptor {
                number: descriptor.interface_number(),
                alternate_setting: descriptor.setting_number(),
                class_code: descriptor.class_code(),
                sub_class_code: descriptor.sub_class_code(),
                protocol_code: descriptor.protocol_code(),
                endpoints: descriptor
                    .endpoint_descriptors()
                    .map(|ep| EndpointDescriptor {
                        address: ep.address(),
                        direction: map_direction(ep.direction()),
                        transfer_kind: map_transfer_type(ep.transfer_type()),
                        max_packet_size: ep.max_packet_size(),
                    })
                    .collect(),
            });
        }
    }
    interfaces
}

/// Map rusb direction to transport Direction
pub fn map_direction(direction: rusb::Direction) -> Direction {
    match direction {
        rusb::Direction::In => Direction::DeviceToHost,
        rusb::Direction::Out => Direction::HostToDevice,
    }
}

/// Map rusb transfer type to transport TransferKind
pub fn map_transfer_type(transfer_type: rusb::TransferType) -> TransferKind {
    match transfer_type {
        rusb::TransferType::Control => TransferKind::Control,
        rusb::TransferType::Isochronous => TransferKind::Isochronous,
        rusb::TransferType::Bulk => TransferKind::Bulk,
        rusb::TransferType::Interrupt => TransferKind::Interrupt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_direction() {
        assert_eq!(map_direction(rusb::Direction::In), Direction::DeviceToHost);
        assert_eq!(map_direction(rusb::Direction::Out), Direction::HostToDevice);
    }

    #[test]
    fn test_map_transfer_type() {
        assert_eq!(
            map_transfer_type(rusb::TransferType::Bulk),
            TransferKind::Bulk
        );
        assert_eq!(
            map_transfer_type(rusb::TransferType::Interrupt),
            TransferKind::Interrupt
        );
        assert_eq!(
            map_transfer_type(rusb::TransferType::Control),
            TransferKind::Control
        );
        assert_eq!(
            map_transfer_type(rusb::TransferType::Isochronous),
            TransferKind::Isochronous
        );
    }
}
