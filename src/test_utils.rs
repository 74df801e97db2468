//! Shared helpers for unit tests, including test-only inverses of the
//! frame decoder.

use crate::advertisement::{Advertisement, Model, Reading};
use crate::config::DeviceConfig;
use crate::mac_address::MacAddress;

/// A stable device address for unit tests.
pub const TEST_MAC: MacAddress = MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// Wrap a manufacturer payload in an [`Advertisement`] from [`TEST_MAC`].
pub fn advertisement(data: Vec<u8>) -> Advertisement {
    Advertisement {
        mac: TEST_MAC,
        rssi: Some(-61),
        data,
    }
}

/// A device config matching the defaults the binary ships with: valid range
/// `[0, 45] °C`, mean reduction, two decimals, spike logging off.
pub fn test_config(address: MacAddress) -> DeviceConfig {
    DeviceConfig {
        address,
        display_name: "Test".to_string(),
        min_valid_temperature: 0.0,
        max_valid_temperature: 45.0,
        log_rejected_spikes: false,
        decimal_places: 2,
        use_median: false,
    }
}

/// A decoded reading from [`TEST_MAC`] with fixed telemetry, so tests only
/// spell out the fields they exercise.
pub fn reading(temperature: f64, humidity: f64) -> Reading {
    Reading {
        mac: TEST_MAC,
        model: Model::H5075,
        temperature,
        humidity,
        battery: 100,
        frame_id: 0x03_21_5A,
        rssi: Some(-61),
    }
}

fn packed_word(temperature: f64, humidity: f64) -> u32 {
    let mut word =
        (temperature.abs() * 10.0).round() as u32 * 1000 + (humidity * 10.0).round() as u32;
    if temperature < 0.0 {
        word |= 0x80_0000;
    }
    word
}

/// Encode an H5072/H5075 payload; values are truncated to the layout's
/// 0.1-degree resolution.
pub fn encode_h5075(temperature: f64, humidity: f64, battery: u8) -> Vec<u8> {
    let word = packed_word(temperature, humidity);
    vec![
        0x88,
        0xEC,
        0x00,
        (word >> 16) as u8,
        (word >> 8) as u8,
        word as u8,
        battery,
        0x00,
    ]
}

/// Encode an H5101/H5102 payload.
pub fn encode_h5102(temperature: f64, humidity: f64, battery: u8) -> Vec<u8> {
    let word = packed_word(temperature, humidity);
    vec![
        0x01,
        0x00,
        0x01,
        0x01,
        (word >> 16) as u8,
        (word >> 8) as u8,
        word as u8,
        battery,
    ]
}

/// Encode an H5074 payload; values carry the layout's 0.01 resolution.
pub fn encode_h5074(temperature: f64, humidity: f64, battery: u8) -> Vec<u8> {
    let temp = ((temperature * 100.0).round() as i16).to_le_bytes();
    let hum = ((humidity * 100.0).round() as u16).to_le_bytes();
    vec![
        0x88, 0xEC, 0x00, temp[0], temp[1], hum[0], hum[1], battery, 0x02,
    ]
}

/// Encode an H5179 payload.
pub fn encode_h5179(temperature: f64, humidity: f64, battery: u8) -> Vec<u8> {
    let temp = ((temperature * 100.0).round() as i16).to_le_bytes();
    let hum = ((humidity * 100.0).round() as u16).to_le_bytes();
    vec![
        0x01, 0x88, 0xEC, 0x00, 0x01, 0x01, temp[0], temp[1], hum[0], hum[1], battery,
    ]
}
