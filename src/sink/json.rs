//! Sink that writes one JSON object per measurement per line.

use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::{Fields, MetricSink, Tags};

#[derive(Serialize)]
struct Line<'a> {
    name: &'a str,
    fields: &'a Fields,
    tags: &'a Tags,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

/// Writes measurements as JSON lines to any writer.
///
/// Calls are serialized through an internal mutex so lines from concurrent
/// extractions never interleave. Write failures are logged and counted; they
/// never reach the collector.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
    written: AtomicU64,
    failed: AtomicU64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Number of lines written successfully.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Number of measurements that could not be written.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Flushes the underlying writer.
    pub fn flush(&self) -> std::io::Result<()> {
        match self.writer.lock() {
            Ok(mut w) => w.flush(),
            Err(poisoned) => poisoned.into_inner().flush(),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> MetricSink for JsonLinesSink<W> {
    fn add_fields(
        &self,
        measurement: &str,
        fields: Fields,
        tags: Tags,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let line = Line {
            name: measurement,
            fields: &fields,
            tags: &tags,
            timestamp,
        };

        let mut buf = match serde_json::to_vec(&line) {
            Ok(buf) => buf,
            Err(e) => {
                warn!("Dropping measurement {}: {}", measurement, e);
                self.failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        buf.push(b'\n');

        let mut writer = match self.writer.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        match writer.write_all(&buf) {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!("Failed to write measurement {}: {}", measurement, e);
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_json_lines_format() {
        let sink = JsonLinesSink::new(Vec::new());

        let mut fields = Fields::new();
        fields.insert("value".to_string(), 0.5);
        let mut tags = Tags::new();
        tags.insert("device".to_string(), "sda".to_string());
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        sink.add_fields("disk_util", fields, tags, Some(ts));
        sink.add_fields("cpu", Fields::new(), Tags::new(), None);

        assert_eq!(sink.written(), 2);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            r#"{"name":"disk_util","fields":{"value":0.5},"tags":{"device":"sda"},"timestamp":"2024-01-02T03:04:05Z"}"#
        );
        assert_eq!(lines[1], r#"{"name":"cpu","fields":{},"tags":{}}"#);
    }

    #[test]
    fn test_json_lines_non_finite_value_written_as_null() {
        let sink = JsonLinesSink::new(Vec::new());
        let mut fields = Fields::new();
        fields.insert("value".to_string(), f64::NAN);

        sink.add_fields("cpu", fields, Tags::new(), None);

        assert_eq!(sink.written(), 1);
        assert_eq!(sink.failed(), 0);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains(r#""value":null"#));
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_lines_write_failure_is_counted() {
        let sink = JsonLinesSink::new(BrokenWriter);
        sink.add_fields("cpu", Fields::new(), Tags::new(), None);

        assert_eq!(sink.written(), 0);
        assert_eq!(sink.failed(), 1);
    }
}
