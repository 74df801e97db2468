//! Dispatch of advertisement frames to per-device sample windows.

use crate::advertisement::{self, Advertisement, Reading};
use crate::config::{ConfigError, DeviceConfig};
use crate::mac_address::MacAddress;
use crate::window::{SampleWindow, Summary};
use log::trace;
use std::collections::HashMap;

/// Owns one [`SampleWindow`] per configured device.
///
/// Built once at start-up; the set of devices never changes afterwards.
/// Windows are kept in configuration order so summaries come out in the
/// order devices were configured.
#[derive(Debug)]
pub struct DeviceRegistry {
    windows: Vec<SampleWindow>,
    by_address: HashMap<MacAddress, usize>,
}

impl DeviceRegistry {
    /// Build the registry, validating every device config. Duplicate
    /// addresses are rejected.
    pub fn new(configs: Vec<DeviceConfig>) -> Result<Self, ConfigError> {
        let mut windows = Vec::with_capacity(configs.len());
        let mut by_address = HashMap::with_capacity(configs.len());
        for config in configs {
            config.validate()?;
            if by_address.insert(config.address, windows.len()).is_some() {
                return Err(ConfigError::DuplicateAddress(config.address));
            }
            windows.push(SampleWindow::new(config));
        }
        Ok(Self {
            windows,
            by_address,
        })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Window for a configured address, if any.
    pub fn window(&self, address: &MacAddress) -> Option<&SampleWindow> {
        self.by_address.get(address).map(|&slot| &self.windows[slot])
    }

    /// Decode one advertisement and feed it to the owning window.
    ///
    /// Returns `true` when the frame both decoded and matched a configured
    /// device. Unrecognized payloads and unmonitored addresses are dropped
    /// silently: both are expected on a shared radio channel.
    pub fn dispatch(&mut self, adv: &Advertisement) -> bool {
        match advertisement::decode(adv) {
            Some(reading) => {
                trace!("{} frame from {}", reading.model, reading.mac);
                self.ingest(&reading)
            }
            None => false,
        }
    }

    /// Route an already-decoded reading to its window.
    pub fn ingest(&mut self, reading: &Reading) -> bool {
        let Some(&slot) = self.by_address.get(&reading.mac) else {
            trace!("ignoring reading from unmonitored device {}", reading.mac);
            return false;
        };
        self.windows[slot].admit(reading);
        true
    }

    /// Reduce every window to a summary, then clear it for the next period.
    /// Reduce-then-reset runs as one unit per window.
    pub fn snapshot_and_reset(&mut self) -> Vec<Summary> {
        self.windows
            .iter_mut()
            .map(|window| {
                let summary = window.reduce();
                window.reset();
                summary
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac_address::MacAddress;
    use crate::test_utils::{TEST_MAC, advertisement, encode_h5075, reading, test_config};

    const OTHER_MAC: MacAddress = MacAddress([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new(vec![test_config(TEST_MAC)]).unwrap()
    }

    #[test]
    fn duplicate_addresses_are_a_startup_error() {
        let result = DeviceRegistry::new(vec![test_config(TEST_MAC), test_config(TEST_MAC)]);
        assert_eq!(result.unwrap_err(), ConfigError::DuplicateAddress(TEST_MAC));
    }

    #[test]
    fn invalid_config_is_a_startup_error() {
        let mut config = test_config(TEST_MAC);
        config.max_valid_temperature = config.min_valid_temperature;
        assert!(DeviceRegistry::new(vec![config]).is_err());
    }

    #[test]
    fn dispatch_routes_frames_to_the_configured_window() {
        let mut registry = registry();
        assert!(registry.dispatch(&advertisement(encode_h5075(21.3, 45.0, 100))));
        assert_eq!(registry.window(&TEST_MAC).unwrap().sample_count(), 1);
    }

    #[test]
    fn dispatch_drops_unmonitored_addresses() {
        let mut registry = registry();
        let mut frame = advertisement(encode_h5075(21.3, 45.0, 100));
        frame.mac = OTHER_MAC;
        assert!(!registry.dispatch(&frame));
        assert_eq!(registry.window(&TEST_MAC).unwrap().sample_count(), 0);
    }

    #[test]
    fn dispatch_drops_foreign_payloads() {
        let mut registry = registry();
        assert!(!registry.dispatch(&advertisement(vec![0x4C, 0x00, 0x02, 0x15])));
        assert_eq!(registry.window(&TEST_MAC).unwrap().sample_count(), 0);
    }

    #[test]
    fn spike_is_rejected_but_mean_survives() {
        // Device at [0, 45]: 21.3 and 21.7 admitted, 999.0 rejected;
        // the mean over the admitted pair rounds to 21.5 at one decimal.
        let mut config = test_config(TEST_MAC);
        config.decimal_places = 1;
        let mut registry = DeviceRegistry::new(vec![config]).unwrap();

        for temp in [21.3, 999.0, 21.7] {
            registry.ingest(&reading(temp, 45.0));
        }

        let summaries = registry.snapshot_and_reset();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].temperature, Some(21.5));
        assert_eq!(summaries[0].sample_count, 2);
        assert_eq!(summaries[0].battery, Some(100));
    }

    #[test]
    fn snapshot_preserves_configuration_order() {
        let mut second = test_config(OTHER_MAC);
        second.display_name = "Second".to_string();
        let mut registry =
            DeviceRegistry::new(vec![test_config(TEST_MAC), second]).unwrap();

        let mut second_reading = reading(30.0, 55.0);
        second_reading.mac = OTHER_MAC;
        registry.ingest(&second_reading);

        let summaries = registry.snapshot_and_reset();
        assert_eq!(summaries[0].address, TEST_MAC);
        assert_eq!(summaries[1].address, OTHER_MAC);
        assert_eq!(summaries[1].temperature, Some(30.0));
    }

    #[test]
    fn consecutive_cycles_do_not_leak_samples() {
        let mut registry = registry();
        registry.ingest(&reading(40.0, 80.0));
        let first = registry.snapshot_and_reset();
        assert_eq!(first[0].temperature, Some(40.0));

        registry.ingest(&reading(20.0, 50.0));
        let second = registry.snapshot_and_reset();
        assert_eq!(second[0].temperature, Some(20.0));
        assert_eq!(second[0].sample_count, 1);

        // A silent third cycle reports no values but keeps telemetry.
        let third = registry.snapshot_and_reset();
        assert_eq!(third[0].temperature, None);
        assert_eq!(third[0].battery, Some(100));
    }
}
