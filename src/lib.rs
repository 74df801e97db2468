//! `govee-monitor` library.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing, logging setup
//! and process exit codes. The aggregation core lives in [`crate::app`]
//! where it can be tested deterministically with an injected scanner and an
//! in-memory output stream.
//!
//! Data flows in one direction: a scanner backend delivers raw
//! [`advertisement::Advertisement`] frames, [`registry::DeviceRegistry`]
//! decodes and routes them into per-device [`window::SampleWindow`]s, and
//! the run loop reduces every window to a [`window::Summary`] at each
//! reporting period.

pub mod advertisement;
pub mod app;
pub mod config;
pub mod filter;
pub mod mac_address;
pub mod output;
pub mod registry;
pub mod scanner;
pub mod window;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use advertisement::{Advertisement, Model, Reading, classify, decode};
pub use config::{ConfigError, DeviceConfig, DeviceSpec, parse_device, parse_duration};
pub use mac_address::MacAddress;
pub use output::SummaryFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use registry::DeviceRegistry;
pub use scanner::{Backend, ScanError};
pub use window::{SampleWindow, Summary};
