//! In-memory sink that keeps every measurement it receives.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::{Fields, Metric, MetricSink, Tags};

/// Collects measurements into a mutex-guarded list.
///
/// Used by tests and by hosts that post-process a cycle's output themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    metrics: Mutex<Vec<Metric>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Metric>> {
        // A panicking producer cannot leave a half-written Vec behind.
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of measurements received so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns a copy of every measurement received so far.
    pub fn metrics(&self) -> Vec<Metric> {
        self.lock().clone()
    }

    /// Returns the measurements with the given name.
    pub fn by_name(&self, name: &str) -> Vec<Metric> {
        self.lock()
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    /// Removes and returns every measurement received so far.
    pub fn drain(&self) -> Vec<Metric> {
        std::mem::take(&mut *self.lock())
    }
}

impl MetricSink for MemorySink {
    fn add_fields(
        &self,
        measurement: &str,
        fields: Fields,
        tags: Tags,
        timestamp: Option<DateTime<Utc>>,
    ) {
        self.lock().push(Metric {
            name: measurement.to_string(),
            fields,
            tags,
            timestamp,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_from_threads() {
        let sink = MemorySink::new();

        std::thread::scope(|s| {
            for i in 0..4 {
                let sink = &sink;
                s.spawn(move || {
                    let mut fields = Fields::new();
                    fields.insert("value".to_string(), i as f64);
                    sink.add_fields(&format!("m{}", i), fields, Tags::new(), None);
                });
            }
        });

        assert_eq!(sink.len(), 4);
        assert_eq!(sink.by_name("m2")[0].fields["value"], 2.0);
    }

    #[test]
    fn test_memory_sink_drain() {
        let sink = MemorySink::new();
        sink.add_fields("cpu", Fields::new(), Tags::new(), None);

        assert_eq!(sink.drain().len(), 1);
        assert!(sink.is_empty());
    }
}
