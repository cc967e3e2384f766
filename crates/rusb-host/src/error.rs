//! Host-side error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("Invalid device filter '{0}', expected VID:PID (e.g., '0x04b8:0x0202' or '0x04b8:*')")]
    InvalidFilter(String),

    #[error("Invalid bus address '{0}', expected BUS:ADDRESS (e.g., '001:004')")]
    InvalidBusAddress(String),

    #[error("No USB printer found matching {0}")]
    PrinterNotFound(String),
}

pub type Result<T> = std::result::Result<T, HostError>;
