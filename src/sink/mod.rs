//! Metric sinks.
//!
//! A sink receives named groups of numeric fields plus string tags, the shape
//! every sysstat extraction produces. Sinks must tolerate concurrent callers:
//! a collection cycle runs its extractions on separate threads and each one
//! writes straight into the shared sink.

mod json;
mod memory;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use json::JsonLinesSink;
pub use memory::MemorySink;

/// Numeric fields of one measurement, keyed by field name.
pub type Fields = BTreeMap<String, f64>;

/// Tags of one measurement, keyed by tag name.
pub type Tags = BTreeMap<String, String>;

/// A single emitted measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub fields: Fields,
    pub tags: Tags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Destination for collected measurements.
pub trait MetricSink: Send + Sync {
    /// Appends one measurement.
    ///
    /// When `timestamp` is `None` the sink decides the time (usually "now").
    fn add_fields(
        &self,
        measurement: &str,
        fields: Fields,
        tags: Tags,
        timestamp: Option<DateTime<Utc>>,
    );
}
