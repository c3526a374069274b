//! Utility modules for sarglot.

mod which;

use std::time::Duration;

pub use which::{SADC_CANDIDATES, find_in_path, find_sadc, is_executable};

/// Formats a duration for log lines: `"850ms"`, `"1.25s"`, `"2m5s"`.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let secs = d.as_secs();
        format!("{}m{}s", secs / 60, secs % 60)
    }
}
