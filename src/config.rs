//! Start-up configuration for monitored devices.
//!
//! Configuration is read once when the process starts and is immutable for
//! its lifetime; anything malformed here is fatal before scanning begins,
//! never at runtime.

use crate::mac_address::MacAddress;
use std::time::Duration;
use thiserror::Error;

/// Per-device configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub address: MacAddress,
    pub display_name: String,
    /// Readings below this temperature are rejected as spikes.
    pub min_valid_temperature: f64,
    /// Readings above this temperature are rejected as spikes.
    pub max_valid_temperature: f64,
    /// Log rejected spikes at warn level instead of debug.
    pub log_rejected_spikes: bool,
    /// Rounding applied when the window is reduced, 0..=3.
    pub decimal_places: u8,
    /// Reduce with the median instead of the arithmetic mean.
    pub use_median: bool,
}

/// Configuration errors, all fatal at start-up.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid temperature range for {address}: min {min} is not below max {max}")]
    InvalidRange {
        address: MacAddress,
        min: f64,
        max: f64,
    },
    #[error("decimal places must be at most 3, got {0}")]
    InvalidDecimals(u8),
    #[error("device {0} is configured more than once")]
    DuplicateAddress(MacAddress),
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // negated comparison so NaN bounds also fail validation
        if !(self.min_valid_temperature < self.max_valid_temperature) {
            return Err(ConfigError::InvalidRange {
                address: self.address,
                min: self.min_valid_temperature,
                max: self.max_valid_temperature,
            });
        }
        if self.decimal_places > 3 {
            return Err(ConfigError::InvalidDecimals(self.decimal_places));
        }
        Ok(())
    }
}

/// A parsed `--device` argument: address plus optional display name.
#[derive(Debug, Clone)]
pub struct DeviceSpec {
    pub address: MacAddress,
    pub name: Option<String>,
}

/// Parse a device spec in the format `MAC` or `MAC=Name`.
pub fn parse_device(src: &str) -> Result<DeviceSpec, String> {
    let (mac, name) = match src.split_once('=') {
        Some((mac, name)) => (mac, Some(name.to_string())),
        None => (src, None),
    };
    let address = mac
        .trim()
        .parse::<MacAddress>()
        .map_err(|e| e.to_string())?;
    Ok(DeviceSpec {
        address,
        name: name.filter(|n| !n.is_empty()),
    })
}

/// Parse a reporting period such as `30s`, `5m`, `2h`, `500ms`, or a bare
/// number of seconds.
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    let digits = src
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(src.len());
    let value: u64 = src[..digits]
        .parse()
        .map_err(|_| format!("invalid duration: '{src}'"))?;
    match src[digits..].trim_start() {
        "" | "s" => Ok(Duration::from_secs(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        suffix => Err(format!("unknown duration suffix: '{suffix}'")),
    }
}
