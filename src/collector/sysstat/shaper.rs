//! Turns parsed records into measurements.
//!
//! Two layouts are supported:
//!
//! - **ungrouped**: every record is its own measurement named
//!   `<description>_<field>` with a single `value` field;
//! - **grouped**: all records of one device are merged into a single
//!   measurement named `<description>`, one field per record.
//!
//! Grouped output can only be emitted once the whole record stream has been
//! seen, so the shaper buffers it until [`OutputShaper::finish`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::parser::Record;
use super::tags::DeviceTags;
use crate::sink::{Fields, MetricSink, Tags};

/// Field name used for ungrouped measurements.
pub const VALUE_FIELD: &str = "value";

/// Fields and tags accumulated for one device in grouped mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAccumulator {
    /// Tags of the first record seen for the device.
    pub tags: Tags,
    pub fields: Fields,
}

/// Shapes the records of one extraction run.
///
/// One shaper exists per extraction; accumulators are never shared.
pub struct OutputShaper<'a> {
    description: &'a str,
    group: bool,
    device_tags: &'a DeviceTags,
    timestamp: Option<DateTime<Utc>>,
    sink: &'a dyn MetricSink,
    groups: BTreeMap<String, GroupAccumulator>,
    emitted: usize,
}

impl<'a> OutputShaper<'a> {
    pub fn new(
        description: &'a str,
        group: bool,
        device_tags: &'a DeviceTags,
        timestamp: Option<DateTime<Utc>>,
        sink: &'a dyn MetricSink,
    ) -> Self {
        Self {
            description,
            group,
            device_tags,
            timestamp,
            sink,
            groups: BTreeMap::new(),
            emitted: 0,
        }
    }

    /// Feeds one record. Ungrouped records go straight to the sink.
    pub fn push(&mut self, record: Record) {
        let field = record.sanitized_field();

        if self.group {
            if let Some(acc) = self.groups.get_mut(record.device_key()) {
                acc.fields.insert(field, record.value);
                return;
            }
            let mut acc = GroupAccumulator {
                tags: self.device_tags.resolve(record.device.as_deref()),
                fields: Fields::new(),
            };
            acc.fields.insert(field, record.value);
            self.groups.insert(record.device_key().to_string(), acc);
        } else {
            let measurement = format!("{}_{}", self.description, field);
            let mut fields = Fields::new();
            fields.insert(VALUE_FIELD.to_string(), record.value);
            let tags = self.device_tags.resolve(record.device.as_deref());
            self.sink.add_fields(&measurement, fields, tags, self.timestamp);
            self.emitted += 1;
        }
    }

    /// Number of devices buffered so far (grouped mode).
    pub fn pending_groups(&self) -> usize {
        self.groups.len()
    }

    /// Flushes grouped measurements, ordered by device, and returns the
    /// total number of measurements this shaper sent to the sink.
    pub fn finish(mut self) -> usize {
        for (_, acc) in std::mem::take(&mut self.groups) {
            self.sink.add_fields(self.description, acc.fields, acc.tags, self.timestamp);
            self.emitted += 1;
        }
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::sysstat::parser::parse_record;
    use crate::sink::{MemorySink, Metric};

    fn records(lines: &[&str]) -> Vec<Record> {
        lines.iter().map(|l| parse_record(l).unwrap()).collect()
    }

    fn shape(records: Vec<Record>, group: bool, device_tags: &DeviceTags) -> Vec<Metric> {
        let sink = MemorySink::new();
        let mut shaper = OutputShaper::new("disk", group, device_tags, None, &sink);
        for record in records {
            shaper.push(record);
        }
        let emitted = shaper.finish();
        assert_eq!(emitted, sink.len());
        sink.metrics()
    }

    const DISK: &[&str] = &[
        "h\t1\tts\tsda\ttps\t10.0",
        "h\t1\tts\tsda\t%util\t0.5",
        "h\t1\tts\tsdb\ttps\t3.0",
        "h\t1\tts\tsda\trd_sec/s\t2.5",
        "h\t1\tts\tsdb\t%util\t0.1",
    ];

    #[test]
    fn test_ungrouped_one_measurement_per_record() {
        let metrics = shape(records(DISK), false, &DeviceTags::new());

        assert_eq!(metrics.len(), DISK.len());
        assert_eq!(metrics[0].name, "disk_tps");
        assert_eq!(metrics[1].name, "disk_pct_util");
        assert_eq!(metrics[3].name, "disk_rd_sec_per_s");
        for m in &metrics {
            assert_eq!(m.fields.len(), 1);
            assert!(m.fields.contains_key(VALUE_FIELD));
        }
        assert_eq!(metrics[3].fields[VALUE_FIELD], 2.5);
        assert_eq!(metrics[2].tags["device"], "sdb");
    }

    #[test]
    fn test_ungrouped_no_device() {
        let sink = MemorySink::new();
        let device_tags = DeviceTags::new();
        let mut shaper = OutputShaper::new("cpu", false, &device_tags, None, &sink);
        shaper.push(parse_record("h\t1\tts\t-\tcpu_idle\t97.3").unwrap());
        assert_eq!(shaper.finish(), 1);

        let metrics = sink.by_name("cpu_cpu_idle");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].fields[VALUE_FIELD], 97.3);
        assert!(!metrics[0].tags.contains_key("device"));
    }

    #[test]
    fn test_grouped_merges_per_device() {
        let metrics = shape(records(DISK), true, &DeviceTags::new());

        assert_eq!(metrics.len(), 2);
        let sda = &metrics[0];
        assert_eq!(sda.name, "disk");
        assert_eq!(sda.tags["device"], "sda");
        let names: Vec<&str> = sda.fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["pct_util", "rd_sec_per_s", "tps"]);

        let sdb = &metrics[1];
        assert_eq!(sdb.tags["device"], "sdb");
        assert_eq!(sdb.fields.len(), 2);
    }

    #[test]
    fn test_grouped_no_device_has_no_device_tag() {
        let lines = [
            "h\t1\tts\t-\tkbmemfree\t1024",
            "h\t1\tts\t-\t%memused\t42.5",
        ];
        let metrics = shape(records(&lines), true, &DeviceTags::new());

        assert_eq!(metrics.len(), 1);
        assert!(metrics[0].tags.is_empty());
        assert_eq!(metrics[0].fields["pct_memused"], 42.5);
    }

    #[test]
    fn test_grouped_order_independent() {
        let mut device_tags = DeviceTags::new();
        device_tags.add("sda", [("vg", "rootvg")]);

        let forward = shape(records(DISK), true, &device_tags);
        let mut reversed_lines = DISK.to_vec();
        reversed_lines.reverse();
        let reversed = shape(records(&reversed_lines), true, &device_tags);
        let mut rotated_lines = DISK.to_vec();
        rotated_lines.rotate_left(2);
        let rotated = shape(records(&rotated_lines), true, &device_tags);

        assert_eq!(forward, reversed);
        assert_eq!(forward, rotated);
        assert_eq!(forward[0].tags["vg"], "rootvg");
        assert!(!forward[1].tags.contains_key("vg"));
    }

    #[test]
    fn test_grouped_tags_fixed_by_first_record() {
        let sink = MemorySink::new();
        let mut device_tags = DeviceTags::new();
        device_tags.add("sda", [("vg", "rootvg")]);

        let mut shaper = OutputShaper::new("disk", true, &device_tags, None, &sink);
        shaper.push(parse_record("h\t1\tts\tsda\ttps\t1").unwrap());
        assert_eq!(shaper.pending_groups(), 1);
        // Sink stays empty until the stream is finished.
        assert!(sink.is_empty());
        shaper.push(parse_record("h\t1\tts\tsda\tawait\t2").unwrap());
        shaper.finish();

        let metrics = sink.metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].tags.len(), 2);
        assert_eq!(metrics[0].tags["vg"], "rootvg");
    }

    #[test]
    fn test_timestamp_attached() {
        let sink = MemorySink::new();
        let device_tags = DeviceTags::new();
        let ts = Utc::now();

        let mut shaper = OutputShaper::new("queue", true, &device_tags, Some(ts), &sink);
        shaper.push(parse_record("h\t1\tts\t-\trunq-sz\t1").unwrap());
        shaper.finish();

        assert_eq!(sink.metrics()[0].timestamp, Some(ts));
    }
}
