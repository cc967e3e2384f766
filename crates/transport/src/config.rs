//! Transport tuning

use crate::error::{Result, TransportError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Staging buffer size for a single read
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Timeout for a single read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(3000);

/// Tuning knobs for [`UsbTransport`](crate::UsbTransport)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Size of the staging buffer used by one read, must be non-zero
    #[serde(default = "TransportConfig::default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Bulk IN timeout for one read
    #[serde(
        rename = "read_timeout_ms",
        default = "TransportConfig::default_read_timeout",
        with = "millis_serde"
    )]
    pub read_timeout: Duration,
    /// Take the interface from other drivers on every write
    #[serde(default = "TransportConfig::default_force_claim")]
    pub force_claim: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: Self::default_read_buffer_size(),
            read_timeout: Self::default_read_timeout(),
            force_claim: Self::default_force_claim(),
        }
    }
}

impl TransportConfig {
    /// Reject values that would make every read come back empty
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(TransportError::InvalidConfig(
                "read_buffer_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn default_read_buffer_size() -> usize {
        DEFAULT_READ_BUFFER_SIZE
    }

    fn default_read_timeout() -> Duration {
        DEFAULT_READ_TIMEOUT
    }

    fn default_force_claim() -> bool {
        true
    }
}

/// Duration as whole milliseconds
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
