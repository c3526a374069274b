//! Sysstat collector configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::collector::sysstat::DeviceTags;
use crate::util::find_in_path;

/// Activities passed to `sadc` when none are configured.
pub const DEFAULT_ACTIVITIES: &[&str] = &["DISK"];

/// Stock `sadf` option table: option token(s) and the description used as
/// measurement name or prefix.
pub const DEFAULT_OPTIONS: &[(&str, &str)] = &[
    ("-C", "cpu"),
    ("-B", "paging"),
    ("-b", "io"),
    ("-d", "disk"), // requires DISK activity
    ("-n ALL", "network"),
    ("-P ALL", "per_cpu"),
    ("-q", "queue"),
    ("-R", "mem"),
    ("-r", "mem_util"),
    ("-S", "swap_util"),
    ("-u", "cpu_util"),
    ("-v", "inode"),
    ("-W", "swap"),
    ("-w", "task"),
];

/// Configuration of one sysstat collector.
///
/// Read-only while a cycle runs; replace it between cycles with
/// `SysstatCollector::set_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SysstatConfig {
    /// Path to the `sadc` data collector.
    ///
    /// Debian/Ubuntu: `/usr/lib/sysstat/sadc`, Arch: `/usr/lib/sa/sadc`,
    /// RHEL/CentOS: `/usr/lib64/sa/sadc`.
    pub sadc_path: PathBuf,
    /// Path to `sadf`.
    pub sadf_path: PathBuf,
    /// Activities passed to `sadc` as `-S <activity>`.
    pub activities: Vec<String>,
    /// `sadf` option token(s) mapped to a description.
    pub options: BTreeMap<String, String>,
    /// Merge all fields of one device into a single measurement.
    pub group: bool,
    /// Extra tags per device.
    pub device_tags: DeviceTags,
    /// Directory for temporary capture artifacts.
    pub tmp_dir: PathBuf,
}

impl Default for SysstatConfig {
    fn default() -> Self {
        Self {
            sadc_path: PathBuf::new(),
            sadf_path: find_in_path("sadf").unwrap_or_default(),
            activities: DEFAULT_ACTIVITIES.iter().map(|s| s.to_string()).collect(),
            options: default_options(),
            group: true,
            device_tags: DeviceTags::default(),
            tmp_dir: std::env::temp_dir(),
        }
    }
}

/// Returns the stock option table.
pub fn default_options() -> BTreeMap<String, String> {
    DEFAULT_OPTIONS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Error type for invalid configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required path is empty.
    MissingPath(&'static str),
    /// An option has an empty token or description.
    InvalidOption(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingPath(name) => write!(f, "{} is required", name),
            ConfigError::InvalidOption(option) => {
                write!(f, "invalid option '{}': token and description must be non-empty", option)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl SysstatConfig {
    /// Creates a configuration with defaults and the given `sadc` path.
    pub fn new(sadc_path: impl Into<PathBuf>) -> Self {
        Self {
            sadc_path: sadc_path.into(),
            ..Self::default()
        }
    }

    /// Checks that the configuration can drive a collection cycle.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sadc_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("sadc_path"));
        }
        if self.sadf_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("sadf_path"));
        }
        for (option, description) in &self.options {
            if option.trim().is_empty() || description.is_empty() {
                return Err(ConfigError::InvalidOption(option.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SysstatConfig::new("/usr/lib/sa/sadc");
        assert_eq!(config.activities, ["DISK"]);
        assert!(config.group);
        assert_eq!(config.options.len(), DEFAULT_OPTIONS.len());
        assert_eq!(config.options["-n ALL"], "network");
        assert!(config.device_tags.is_empty());
    }

    #[test]
    fn test_validate_requires_paths() {
        let mut config = SysstatConfig::new("");
        config.sadf_path = PathBuf::from("/usr/bin/sadf");
        assert_eq!(config.validate(), Err(ConfigError::MissingPath("sadc_path")));

        config.sadc_path = PathBuf::from("/usr/lib/sa/sadc");
        assert_eq!(config.validate(), Ok(()));

        config.sadf_path = PathBuf::new();
        assert_eq!(config.validate(), Err(ConfigError::MissingPath("sadf_path")));
    }

    #[test]
    fn test_validate_rejects_empty_description() {
        let mut config = SysstatConfig::new("/usr/lib/sa/sadc");
        config.sadf_path = PathBuf::from("/usr/bin/sadf");
        config.options.insert("-H".to_string(), String::new());

        assert!(matches!(config.validate(), Err(ConfigError::InvalidOption(o)) if o == "-H"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SysstatConfig = serde_json::from_str(
            r#"{
                "sadc_path": "/usr/lib/sa/sadc",
                "sadf_path": "/usr/bin/sadf",
                "group": false,
                "options": {"-d": "disk"},
                "device_tags": {"sda": [{"vg": "rootvg"}]}
            }"#,
        )
        .unwrap();

        assert!(!config.group);
        assert_eq!(config.options.len(), 1);
        assert_eq!(config.activities, ["DISK"]);
        assert_eq!(config.device_tags.resolve(Some("sda"))["vg"], "rootvg");
        assert_eq!(config.validate(), Ok(()));
    }
}
