//! Spike filtering for decoded readings.
//!
//! A reading whose temperature falls outside the device's configured valid
//! range never reaches the sample window. Rejection is not an error: the
//! window simply does not grow, and battery/RSSI telemetry still updates.

use crate::config::DeviceConfig;

/// Multiple of the observed standard deviation beyond which an admitted
/// reading is flagged in diagnostics. Flagging never rejects.
const DEVIATION_FACTOR: f64 = 3.0;

/// Decide whether a temperature reading may enter the sample window.
/// The valid range is closed on both ends.
pub fn admit(config: &DeviceConfig, temperature: f64) -> bool {
    temperature >= config.min_valid_temperature && temperature <= config.max_valid_temperature
}

/// Diagnostic check: does `candidate` sit far outside the spread of the
/// samples admitted so far this cycle?
pub fn deviates(samples: &[f64], candidate: f64) -> bool {
    if samples.len() < 2 {
        return false;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let variance =
        samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    let spread = variance.sqrt();
    if spread == 0.0 {
        return candidate != mean;
    }
    (candidate - mean).abs() > DEVIATION_FACTOR * spread
}
