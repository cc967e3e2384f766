//! Printer enumeration
//!
//! Lists attached devices that expose a printer-class interface.

use crate::directory::read_interfaces;
use crate::error::{HostError, Result};
use crate::filter::{DeviceFilter, DeviceSelector};
use rusb::{Device, DeviceDescriptor, DeviceHandle, UsbContext};
use tracing::{debug, info};
use transport::Direction;

/// Summary of an attached printer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterInfo {
    pub bus_number: u8,
    pub device_address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub interface_number: u8,
    /// Host-to-device bulk endpoint address
    pub write_endpoint: Option<u8>,
    /// Device-to-host bulk endpoint address
    pub read_endpoint: Option<u8>,
}

impl PrinterInfo {
    /// Whether the printer interface has both bulk endpoints
    pub fn is_usable(&self) -> bool {
        self.write_endpoint.is_some() && self.read_endpoint.is_some()
    }
}

/// A printer together with its device key
pub struct PrinterDevice<T: UsbContext> {
    pub device: Device<T>,
    pub info: PrinterInfo,
}

/// All attached printers matching `filter`
///
/// Devices whose descriptors cannot be read are skipped.
pub fn list_printers<T: UsbContext>(
    context: &T,
    filter: &DeviceFilter,
) -> Result<Vec<PrinterDevice<T>>> {
    let mut printers = Vec::new();

    for device in context.devices()?.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(descriptor) => descriptor,
            Err(e) => {
                debug!(
                    "Skipping bus {:03} device {:03}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                continue;
            }
        };

        if !filter.matches(descriptor.vendor_id(), descriptor.product_id()) {
            continue;
        }

        if let Some(info) = printer_info(&device, &descriptor) {
            printers.push(PrinterDevice { device, info });
        }
    }

    info!("Found {} USB printer(s)", printers.len());
    Ok(printers)
}

/// First attached printer picked by `selector`
pub fn find_printer<T: UsbContext>(
    context: &T,
    selector: &DeviceSelector,
) -> Result<PrinterDevice<T>> {
    list_printers(context, &DeviceFilter::any())?
        .into_iter()
        .find(|printer| {
            let info = &printer.info;
            selector.matches(
                info.bus_number,
                info.device_address,
                info.vendor_id,
                info.product_id,
            )
        })
        .ok_or_else(|| HostError::PrinterNotFound(selector.to_string()))
}

fn printer_info<T: UsbContext>(
    device: &Device<T>,
    descriptor: &DeviceDescriptor,
) -> Option<PrinterInfo> {
    let interface = read_interfaces(device)
        .ok()?
        .into_iter()
        .find(|i| i.is_printer())?;

    // Try to open device temporarily to read strings
    let strings = device
        .open()
        .ok()
        .map(|handle| read_string_descriptors(&handle, descriptor));
    let (manufacturer, product, serial_number) = strings.unwrap_or((None, None, None));

    Some(PrinterInfo {
        bus_number: device.bus_number(),
        device_address: device.address(),
        vendor_id: descriptor.vendor_id(),
        product_id: descriptor.product_id(),
        manufacturer,
        product,
        serial_number,
        interface_number: interface.number,
        write_endpoint: interface
            .bulk_endpoint(Direction::HostToDevice)
            .map(|ep| ep.address),
        read_endpoint: interface
            .bulk_endpoint(Direction::DeviceToHost)
            .map(|ep| ep.address),
    })
}

fn read_string_descriptors<T: UsbContext>(
    handle: &DeviceHandle<T>,
    descriptor: &DeviceDescriptor,
) -> (Option<String>, Option<String>, Option<String>) {
    let manufacturer = descriptor
        .manufacturer_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let product = descriptor
        .product_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let serial_number = descriptor
        .serial_number_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    (manufacturer, product, serial_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(write_endpoint: Option<u8>, read_endpoint: Option<u8>) -> PrinterInfo {
        PrinterInfo {
            bus_number: 1,
            device_address: 4,
            vendor_id: 0x04b8,
            product_id: 0x0202,
            manufacturer: None,
            product: None,
            serial_number: None,
            interface_number: 0,
            write_endpoint,
            read_endpoint,
        }
    }

    #[test]
    fn test_is_usable() {
        assert!(info(Some(0x01), Some(0x82)).is_usable());
        assert!(!info(Some(0x01), None).is_usable());
        assert!(!info(None, Some(0x82)).is_usable());
    }
}
