//! Core run loop for `govee-monitor`.
//!
//! Frames from the scanner are dispatched into the device registry as they
//! arrive; at every reporting period the registry is reduced to one summary
//! per device, written to the output stream, and reset. The module is
//! decoupled from CLI parsing and process exit codes so it can be tested
//! deterministically with an injected scanner and an in-memory output
//! stream.

use crate::advertisement::Advertisement;
use crate::config::{self, ConfigError, DeviceConfig, DeviceSpec};
use crate::output::SummaryFormatter;
use crate::output::influxdb::InfluxDbFormatter;
use crate::registry::DeviceRegistry;
use crate::scanner::{Backend, ScanError};
use clap::Parser;
use log::{debug, info, warn};
use std::future::Future;
use std::io;
use std::io::Write;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Monitored sensor, repeatable.
    /// Format: --device A4:C1:38:AA:BB:CC=Salon (name optional)
    #[arg(long = "device", value_parser = config::parse_device, value_name = "DEVICE", required = true)]
    pub devices: Vec<DeviceSpec>,

    /// Reporting period between summaries.
    /// Accepts duration with suffix: 30s, 5m, 500ms.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, value_parser = config::parse_duration, default_value = "60")]
    pub period: Duration,

    /// Lowest plausible temperature; colder readings are rejected as spikes.
    #[arg(long, default_value_t = 0.0, value_name = "CELSIUS", allow_negative_numbers = true)]
    pub min_temperature: f64,

    /// Highest plausible temperature; hotter readings are rejected as spikes.
    #[arg(long, default_value_t = 45.0, value_name = "CELSIUS", allow_negative_numbers = true)]
    pub max_temperature: f64,

    /// Reduce each window with the median instead of the mean.
    #[arg(long)]
    pub use_median: bool,

    /// Decimal places in reported values.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub decimals: u8,

    /// Log rejected spikes at warn level.
    #[arg(long)]
    pub log_spikes: bool,

    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "govee_summary")]
    pub influxdb_measurement: String,

    /// Stop after this many reporting cycles instead of running until
    /// interrupted.
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,

    /// Verbose logging (spike and dispatch diagnostics).
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Bluetooth scanner backend to use
    #[arg(long, default_value_t, value_enum)]
    pub backend: Backend,
}

impl Options {
    /// Expand the CLI surface into one immutable config per device.
    /// Validation happens here, before any scanning starts.
    pub fn device_configs(&self) -> Result<Vec<DeviceConfig>, ConfigError> {
        self.devices
            .iter()
            .map(|spec| {
                let config = DeviceConfig {
                    address: spec.address,
                    display_name: spec
                        .name
                        .clone()
                        .unwrap_or_else(|| spec.address.to_string()),
                    min_valid_temperature: self.min_temperature,
                    max_valid_temperature: self.max_temperature,
                    log_rejected_spikes: self.log_spikes,
                    decimal_places: self.decimals,
                    use_median: self.use_median,
                };
                config.validate().map(|()| config)
            })
            .collect()
    }
}

/// Errors returned by the core run loop.
///
/// Scan failures are deliberately absent: starting or restarting the scan
/// is retried at the next period instead of aborting the loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Scanner abstraction so the loop can be driven without Bluetooth
/// hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(
        &self,
        backend: Backend,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Advertisement>, ScanError>> + Send + '_>>;
}

/// Real scanner implementation that delegates to the compiled-in backends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(
        &self,
        backend: Backend,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Advertisement>, ScanError>> + Send + '_>>
    {
        Box::pin(async move { crate::scanner::start_scan(backend).await })
    }
}

/// Wait for the next frame, or forever when the scanner is down. The
/// reporting timer keeps firing either way.
async fn next_frame(frames: Option<&mut mpsc::Receiver<Advertisement>>) -> Option<Advertisement> {
    match frames {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Run the aggregation loop, writing one summary line per device to `out`
/// at every reporting period.
///
/// Frame dispatch and the reporting timer run on independent time bases;
/// they only synchronize at the reduce-and-reset step, which completes as
/// one unit before the next frame is dispatched. A scan failure is logged
/// and retried at the next period; it never terminates the loop.
pub async fn run_with_io(
    options: Options,
    scanner: &dyn Scanner,
    out: &mut dyn Write,
) -> Result<(), RunError> {
    let mut registry = DeviceRegistry::new(options.device_configs()?)?;
    let formatter = InfluxDbFormatter::new(options.influxdb_measurement.clone());

    info!(
        "monitoring {} device(s), reporting every {:?}",
        registry.len(),
        options.period
    );

    let mut frames = match scanner.start_scan(options.backend).await {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!("scan start failed, retrying next period: {e}");
            None
        }
    };

    let mut ticker = tokio::time::interval(options.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // the first tick completes immediately

    let mut completed = 0u64;
    loop {
        tokio::select! {
            received = next_frame(frames.as_mut()) => match received {
                Some(frame) => {
                    registry.dispatch(&frame);
                }
                None => {
                    warn!("scanner stream closed, restarting next period");
                    frames = None;
                }
            },
            _ = ticker.tick() => {
                debug!("reporting cycle {}", completed + 1);
                for summary in registry.snapshot_and_reset() {
                    writeln!(out, "{}", formatter.format(&summary))?;
                }
                out.flush()?;

                completed += 1;
                if let Some(limit) = options.cycles
                    && completed >= limit
                {
                    return Ok(());
                }

                if frames.is_none() {
                    match scanner.start_scan(options.backend).await {
                        Ok(rx) => frames = Some(rx),
                        Err(e) => warn!("scan restart failed, retrying next period: {e}"),
                    }
                }
            }
        }
    }
}
