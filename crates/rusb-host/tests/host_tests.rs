//! Host crate integration tests
//!
//! Device filters as they appear in configuration files, and the trait
//! wiring between the libusb host and the transport. No hardware needed.
//!
//! Run with: `cargo test -p rusb-host --test host_tests`

use rusb_host::{BusAddress, DeviceFilter, DeviceSelector, HostError, RusbDirectory, RusbOpener};
use serde::Deserialize;
use transport::{ConnectionOpener, DeviceDirectory};

#[derive(Debug, Deserialize)]
struct DeviceSection {
    filter: DeviceFilter,
}

// ============================================================================
// Filter Configuration Tests
// ============================================================================

mod filter_config {
    use super::*;

    #[test]
    fn test_filter_from_toml() {
        let section: DeviceSection = toml::from_str(r#"filter = "0x0416:0x5011""#).unwrap();
        assert_eq!(section.filter, DeviceFilter::new(0x0416, 0x5011));
    }

    #[test]
    fn test_wildcard_filter_from_toml() {
        let section: DeviceSection = toml::from_str(r#"filter = "04b8:*""#).unwrap();
        assert!(section.filter.matches(0x04b8, 0x0e15));
        assert!(!section.filter.matches(0x0416, 0x5011));
    }

    #[test]
    fn test_invalid_filter_rejected_by_toml() {
        let result: Result<DeviceSection, _> = toml::from_str(r#"filter = "epson""#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid device filter"));
    }

    #[test]
    fn test_filter_roundtrips_through_string() {
        let filter = DeviceFilter {
            vendor_id: None,
            product_id: Some(0x0202),
        };
        let text: String = filter.into();
        assert_eq!(text, "*:0x0202");
        assert_eq!(text.parse::<DeviceFilter>().unwrap(), filter);
    }
}

// ============================================================================
// Selector Tests
// ============================================================================

mod selector {
    use super::*;

    #[test]
    fn test_default_selector_matches_everything() {
        let selector = DeviceSelector::default();
        assert!(selector.matches(1, 2, 0x1234, 0x5678));
    }

    #[test]
    fn test_selector_display() {
        let selector = DeviceSelector::BusAddress("1:4".parse().unwrap());
        assert_eq!(selector.to_string(), "bus 001 device 004");

        let selector = DeviceSelector::Filter(DeviceFilter::new(0x04b8, 0x0202));
        assert_eq!(selector.to_string(), "filter 0x04b8:0x0202");
    }

    #[test]
    fn test_bus_address_error() {
        let err = "usb1".parse::<BusAddress>().unwrap_err();
        assert!(matches!(err, HostError::InvalidBusAddress(_)));
    }

    #[test]
    fn test_printer_not_found_message() {
        let err = HostError::PrinterNotFound(DeviceSelector::default().to_string());
        assert_eq!(err.to_string(), "No USB printer found matching filter *:*");
    }
}

// ============================================================================
// Trait Wiring
// ============================================================================

fn assert_directory<D, R: DeviceDirectory<D>>(_: &R) {}

fn assert_opener<D, O: ConnectionOpener<D>>(_: &O) {}

#[test]
fn test_host_implements_transport_traits() {
    assert_directory::<rusb::Device<rusb::Context>, _>(&RusbDirectory);
    assert_opener::<rusb::Device<rusb::Context>, _>(&RusbOpener);
    assert_directory::<rusb::Device<rusb::GlobalContext>, _>(&RusbDirectory);
    assert_opener::<rusb::Device<rusb::GlobalContext>, _>(&RusbOpener);
}
