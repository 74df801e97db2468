//! Output formatting for per-cycle summaries.
//!
//! The downstream presentation layer (Telegraf, a home-automation bridge)
//! consumes one formatted line per device per reporting cycle. The trait
//! keeps the run loop independent of the wire format.

pub mod influxdb;

use crate::window::Summary;

/// Convert one [`Summary`] into one output line.
pub trait SummaryFormatter: Send + Sync {
    fn format(&self, summary: &Summary) -> String;
}
