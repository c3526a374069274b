//! Pre-built `sadf -p` outputs for testing.
//!
//! Outputs mirror what `sadf -p -- -p <option>` prints for a capture with
//! two sample points: one record per line, tab separated.

use super::runner::MockRunner;

#[allow(dead_code)]
impl MockRunner {
    /// `sadf -p -- -p -u`: CPU utilization, device column `all`.
    pub const SADF_CPU: &'static str = "\
web01\t9\t2024-01-02 03:04:05 UTC\tall\t%user\t2.51
web01\t9\t2024-01-02 03:04:05 UTC\tall\t%nice\t0.00
web01\t9\t2024-01-02 03:04:05 UTC\tall\t%system\t1.13
web01\t9\t2024-01-02 03:04:05 UTC\tall\t%iowait\t0.25
web01\t9\t2024-01-02 03:04:05 UTC\tall\t%steal\t0.00
web01\t9\t2024-01-02 03:04:05 UTC\tall\t%idle\t96.11
";

    /// `sadf -p -- -p -d`: block devices with pretty names.
    pub const SADF_DISK: &'static str = "\
web01\t9\t2024-01-02 03:04:05 UTC\tsda\ttps\t4.22
web01\t9\t2024-01-02 03:04:05 UTC\tsda\trkB/s\t0.00
web01\t9\t2024-01-02 03:04:05 UTC\tsda\twkB/s\t61.33
web01\t9\t2024-01-02 03:04:05 UTC\tsda\tawait\t0.84
web01\t9\t2024-01-02 03:04:05 UTC\tsda\t%util\t0.36
web01\t9\t2024-01-02 03:04:05 UTC\tsdb\ttps\t0.11
web01\t9\t2024-01-02 03:04:05 UTC\tsdb\trkB/s\t1.78
web01\t9\t2024-01-02 03:04:05 UTC\tsdb\twkB/s\t0.00
web01\t9\t2024-01-02 03:04:05 UTC\tsdb\tawait\t0.20
web01\t9\t2024-01-02 03:04:05 UTC\tsdb\t%util\t0.02
";

    /// `sadf -p -- -p -n DEV`: network interfaces.
    pub const SADF_NETWORK: &'static str = "\
web01\t9\t2024-01-02 03:04:05 UTC\teth0\trxpck/s\t31.89
web01\t9\t2024-01-02 03:04:05 UTC\teth0\ttxpck/s\t29.67
web01\t9\t2024-01-02 03:04:05 UTC\teth0\trxkB/s\t4.08
web01\t9\t2024-01-02 03:04:05 UTC\teth0\ttxkB/s\t11.52
web01\t9\t2024-01-02 03:04:05 UTC\teth0\t%ifutil\t0.01
web01\t9\t2024-01-02 03:04:05 UTC\tlo\trxpck/s\t2.00
web01\t9\t2024-01-02 03:04:05 UTC\tlo\ttxpck/s\t2.00
web01\t9\t2024-01-02 03:04:05 UTC\tlo\trxkB/s\t0.13
web01\t9\t2024-01-02 03:04:05 UTC\tlo\ttxkB/s\t0.13
web01\t9\t2024-01-02 03:04:05 UTC\tlo\t%ifutil\t0.00
";

    /// `sadf -p -- -p -r`: memory utilization, no device.
    pub const SADF_MEMORY: &'static str = "\
web01\t9\t2024-01-02 03:04:05 UTC\t-\tkbmemfree\t6051560
web01\t9\t2024-01-02 03:04:05 UTC\t-\tkbavail\t12530200
web01\t9\t2024-01-02 03:04:05 UTC\t-\tkbmemused\t3220436
web01\t9\t2024-01-02 03:04:05 UTC\t-\t%memused\t19.66
web01\t9\t2024-01-02 03:04:05 UTC\t-\tkbcommit\t5119876
web01\t9\t2024-01-02 03:04:05 UTC\t-\t%commit\t25.01
";

    /// `sadf -p -- -p -q`: run queue and load averages, no device.
    pub const SADF_QUEUE: &'static str = "\
web01\t9\t2024-01-02 03:04:05 UTC\t-\trunq-sz\t1
web01\t9\t2024-01-02 03:04:05 UTC\t-\tplist-sz\t412
web01\t9\t2024-01-02 03:04:05 UTC\t-\tldavg-1\t0.15
web01\t9\t2024-01-02 03:04:05 UTC\t-\tldavg-5\t0.10
web01\t9\t2024-01-02 03:04:05 UTC\t-\tldavg-15\t0.05
web01\t9\t2024-01-02 03:04:05 UTC\t-\tblocked\t0
";

    /// A healthy host: capture succeeds and `-u`, `-d`, `-n DEV`, `-r` and
    /// `-q` all produce output.
    pub fn typical_system() -> Self {
        Self::new()
            .with_extraction("-u", Self::SADF_CPU, 0)
            .with_extraction("-d", Self::SADF_DISK, 0)
            .with_extraction("-n DEV", Self::SADF_NETWORK, 0)
            .with_extraction("-r", Self::SADF_MEMORY, 0)
            .with_extraction("-q", Self::SADF_QUEUE, 0)
    }

    /// The option table matching [`MockRunner::typical_system`].
    pub fn typical_options() -> std::collections::BTreeMap<String, String> {
        [
            ("-u", "cpu_util"),
            ("-d", "disk"),
            ("-n DEV", "network"),
            ("-r", "mem_util"),
            ("-q", "queue"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }
}
