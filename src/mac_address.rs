//! Compact 48-bit hardware address for BLE devices.
//!
//! The registry keys every configured sensor by its address, so the type is
//! a plain 6-byte array that hashes cheaply and stays independent of any
//! particular Bluetooth backend.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A Bluetooth device address stored as six big-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Errors returned when parsing an address string.
#[derive(Error, Debug, PartialEq)]
pub enum ParseMacError {
    #[error("invalid address: expected 6 octets, got {0}")]
    OctetCount(usize),
    #[error("invalid address: '{0}' is not a two-digit hex octet")]
    BadOctet(String),
}

impl FromStr for MacAddress {
    type Err = ParseMacError;

    /// Accepts `AA:BB:CC:DD:EE:FF` and `AA-BB-CC-DD-EE-FF`, case
    /// insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut filled = 0;
        for octet in s.split([':', '-']) {
            if filled == 6 {
                return Err(ParseMacError::OctetCount(s.split([':', '-']).count()));
            }
            if octet.len() != 2 {
                return Err(ParseMacError::BadOctet(octet.to_string()));
            }
            bytes[filled] = u8::from_str_radix(octet, 16)
                .map_err(|_| ParseMacError::BadOctet(octet.to_string()))?;
            filled += 1;
        }
        if filled != 6 {
            return Err(ParseMacError::OctetCount(filled));
        }
        Ok(MacAddress(bytes))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::Address> for MacAddress {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}

#[cfg(feature = "bluer")]
impl From<MacAddress> for bluer::Address {
    fn from(addr: MacAddress) -> Self {
        bluer::Address(addr.0)
    }
}
