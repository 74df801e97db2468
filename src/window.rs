//! Per-device sample accumulation and reduction.

use crate::advertisement::Reading;
use crate::config::DeviceConfig;
use crate::filter;
use crate::mac_address::MacAddress;
use log::{debug, warn};

/// Hard cap on samples buffered per sequence within one reporting period.
/// A real sensor advertising every couple of seconds stays well under this;
/// a misbehaving source hits the cap and further samples are dropped until
/// the next reset.
pub const MAX_SAMPLES: usize = 4096;

/// Reduced per-device result for one reporting period.
///
/// `None` measurement fields mean the device was silent, or every reading
/// was rejected, during the period.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub address: MacAddress,
    pub name: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub battery: Option<u8>,
    pub rssi: Option<i16>,
    pub sample_count: usize,
}

/// Accumulates admitted readings for one configured device.
///
/// The sample sequences are cleared at every cycle boundary. Last-seen
/// battery, RSSI and frame id survive resets: they describe current device
/// state, not windowed statistics.
#[derive(Debug)]
pub struct SampleWindow {
    config: DeviceConfig,
    temperatures: Vec<f64>,
    humidities: Vec<f64>,
    last_battery: Option<u8>,
    last_rssi: Option<i16>,
    last_frame_id: Option<u32>,
}

impl SampleWindow {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            temperatures: Vec::new(),
            humidities: Vec::new(),
            last_battery: None,
            last_rssi: None,
            last_frame_id: None,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn sample_count(&self) -> usize {
        self.temperatures.len()
    }

    pub fn last_battery(&self) -> Option<u8> {
        self.last_battery
    }

    pub fn last_rssi(&self) -> Option<i16> {
        self.last_rssi
    }

    pub fn last_frame_id(&self) -> Option<u32> {
        self.last_frame_id
    }

    /// Feed one decoded reading into the window.
    ///
    /// Battery, RSSI and frame id update even when the measurement itself
    /// is rejected: device telemetry is trusted independently of whether
    /// the measured value is plausible.
    pub fn admit(&mut self, reading: &Reading) {
        self.last_battery = Some(reading.battery);
        if reading.rssi.is_some() {
            self.last_rssi = reading.rssi;
        }
        self.last_frame_id = Some(reading.frame_id);

        if !filter::admit(&self.config, reading.temperature) {
            if self.config.log_rejected_spikes {
                warn!(
                    "{}: rejected spike {:.2} °C outside [{}, {}]",
                    self.config.display_name,
                    reading.temperature,
                    self.config.min_valid_temperature,
                    self.config.max_valid_temperature
                );
            } else {
                debug!(
                    "{}: rejected spike {:.2} °C",
                    self.config.display_name, reading.temperature
                );
            }
            return;
        }

        if self.config.log_rejected_spikes
            && filter::deviates(&self.temperatures, reading.temperature)
        {
            debug!(
                "{}: admitted reading {:.2} °C deviates from the window so far",
                self.config.display_name, reading.temperature
            );
        }

        if self.temperatures.len() == MAX_SAMPLES {
            debug!(
                "{}: sample cap reached, dropping reading",
                self.config.display_name
            );
            return;
        }
        self.temperatures.push(reading.temperature);
        self.humidities.push(reading.humidity);
    }

    /// Reduce the window to a [`Summary`] without mutating it.
    pub fn reduce(&self) -> Summary {
        let decimals = self.config.decimal_places;
        let use_median = self.config.use_median;
        Summary {
            address: self.config.address,
            name: self.config.display_name.clone(),
            temperature: reduce_samples(&self.temperatures, use_median)
                .map(|v| round_to(v, decimals)),
            humidity: reduce_samples(&self.humidities, use_median)
                .map(|v| round_to(v, decimals)),
            battery: self.last_battery,
            rssi: self.last_rssi,
            sample_count: self.temperatures.len(),
        }
    }

    /// Clear the sample sequences for the next period. Last-seen telemetry
    /// is preserved.
    pub fn reset(&mut self) {
        self.temperatures.clear();
        self.humidities.clear();
    }
}

/// Mean or median of a sample sequence; `None` when empty, so reduction
/// never divides by zero.
fn reduce_samples(samples: &[f64], use_median: bool) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(if use_median {
        median(samples)
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    })
}

/// Median with the lower-middle element on even-length sequences, so ties
/// break deterministically.
fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted[(sorted.len() - 1) / 2]
}

/// Round half away from zero to `decimals` places.
fn round_to(value: f64, decimals: u8) -> f64 {
    let scale = 10f64.powi(i32::from(decimals));
    (value * scale).round() / scale
}
