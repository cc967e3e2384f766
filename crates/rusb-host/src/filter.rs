//! Device selection
//!
//! `VID:PID` filter patterns and exact bus/address selectors.

use crate::error::HostError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// VID:PID pattern, either half may be `*`
///
/// Hex IDs may be written with or without the `0x` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceFilter {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
}

impl DeviceFilter {
    /// Filter matching every device
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            product_id: Some(product_id),
        }
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id.is_none_or(|v| v == vendor_id)
            && self.product_id.is_none_or(|p| p == product_id)
    }

    fn parse_id(part: &str, filter: &str) -> Result<Option<u16>, HostError> {
        if part == "*" {
            return Ok(None);
        }

        let hex = part
            .strip_prefix("0x")
            .or_else(|| part.strip_prefix("0X"))
            .unwrap_or(part);
        if hex.is_empty() || hex.len() > 4 {
            return Err(HostError::InvalidFilter(filter.to_string()));
        }

        u16::from_str_radix(hex, 16)
            .map(Some)
            .map_err(|_| HostError::InvalidFilter(filter.to_string()))
    }
}

impl FromStr for DeviceFilter {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let filter = s.trim();
        let parts: Vec<&str> = filter.split(':').collect();
        if parts.len() != 2 {
            return Err(HostError::InvalidFilter(filter.to_string()));
        }

        Ok(Self {
            vendor_id: Self::parse_id(parts[0], filter)?,
            product_id: Self::parse_id(parts[1], filter)?,
        })
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vendor_id {
            Some(vid) => write!(f, "{:#06x}", vid)?,
            None => write!(f, "*")?,
        }
        write!(f, ":")?;
        match self.product_id {
            Some(pid) => write!(f, "{:#06x}", pid),
            None => write!(f, "*"),
        }
    }
}

impl TryFrom<String> for DeviceFilter {
    type Error = HostError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceFilter> for String {
    fn from(filter: DeviceFilter) -> Self {
        filter.to_string()
    }
}

/// Exact bus number and device address, as shown by `lsusb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusAddress {
    pub bus: u8,
    pub address: u8,
}

impl FromStr for BusAddress {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HostError::InvalidBusAddress(s.to_string());
        let (bus, address) = s.trim().split_once(':').ok_or_else(invalid)?;

        Ok(Self {
            bus: bus.parse().map_err(|_| invalid())?,
            address: address.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus {:03} device {:03}", self.bus, self.address)
    }
}

/// How to pick one printer among the attached ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    /// First printer matching the filter
    Filter(DeviceFilter),
    /// Printer at this bus and address
    BusAddress(BusAddress),
}

impl Default for DeviceSelector {
    fn default() -> Self {
        DeviceSelector::Filter(DeviceFilter::any())
    }
}

impl DeviceSelector {
    pub fn matches(&self, bus: u8, address: u8, vendor_id: u16, product_id: u16) -> bool {
        match self {
            DeviceSelector::Filter(filter) => filter.matches(vendor_id, product_id),
            DeviceSelector::BusAddress(target) => target.bus == bus && target.address == address,
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Filter(filter) => write!(f, "filter {}", filter),
            DeviceSelector::BusAddress(target) => write!(f, "{}", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_valid() {
        assert_eq!(
            "0x04b8:0x0202".parse::<DeviceFilter>().unwrap(),
            DeviceFilter::new(0x04b8, 0x0202)
        );
        assert_eq!(
            "04b8:*".parse::<DeviceFilter>().unwrap(),
            DeviceFilter {
                vendor_id: Some(0x04b8),
                product_id: None
            }
        );
        assert_eq!("*:*".parse::<DeviceFilter>().unwrap(), DeviceFilter::any());
        assert!("0XABCD:0xef01".parse::<DeviceFilter>().is_ok());
    }

    #[test]
    fn test_parse_filter_invalid() {
        assert!("0x1234".parse::<DeviceFilter>().is_err());
        assert!("0x1234:0x5678:0x9abc".parse::<DeviceFilter>().is_err());
        assert!("0xGHIJ:0x5678".parse::<DeviceFilter>().is_err());
        assert!("0x12345:0x5678".parse::<DeviceFilter>().is_err());
        assert!("0x:0x5678".parse::<DeviceFilter>().is_err());
    }

    #[test]
    fn test_filter_logic() {
        let filter: DeviceFilter = "0x1234:0x5678".parse().unwrap();
        assert!(filter.matches(0x1234, 0x5678));
        assert!(!filter.matches(0x1234, 0x9999)); // Wrong PID
        assert!(!filter.matches(0x9999, 0x5678)); // Wrong VID

        let vendor: DeviceFilter = "0xabcd:*".parse().unwrap();
        assert!(vendor.matches(0xABCD, 0x1111));
        assert!(vendor.matches(0xABCD, 0x9999));

        assert!(DeviceFilter::any().matches(0x0000, 0xFFFF));
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(DeviceFilter::new(0x04b8, 0x0202).to_string(), "0x04b8:0x0202");
        assert_eq!(DeviceFilter::any().to_string(), "*:*");
    }

    #[test]
    fn test_bus_address() {
        let target: BusAddress = "001:004".parse().unwrap();
        assert_eq!(target, BusAddress { bus: 1, address: 4 });

        assert!("1".parse::<BusAddress>().is_err());
        assert!("1:300".parse::<BusAddress>().is_err());
        assert!("a:b".parse::<BusAddress>().is_err());
    }

    #[test]
    fn test_selector_matches() {
        let by_location = DeviceSelector::BusAddress(BusAddress { bus: 3, address: 7 });
        assert!(by_location.matches(3, 7, 0x1111, 0x2222));
        assert!(!by_location.matches(3, 8, 0x1111, 0x2222));

        let by_id = DeviceSelector::Filter(DeviceFilter::new(0x1111, 0x2222));
        assert!(by_id.matches(9, 9, 0x1111, 0x2222));
        assert!(!by_id.matches(3, 7, 0x1111, 0x3333));
    }
}
