//! Extra static tags for devices.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sink::Tags;

/// Per-device tag overlays.
///
/// Each device maps to an ordered list of tag sets. The sets are merged in
/// list order, so later entries overwrite keys from earlier ones.
///
/// ```
/// use sarglot::collector::sysstat::DeviceTags;
/// use sarglot::sink::Tags;
///
/// let mut device_tags = DeviceTags::new();
/// device_tags.add("sda", [("vg", "rootvg")]);
///
/// let mut tags = Tags::new();
/// device_tags.apply("sda", &mut tags);
/// assert_eq!(tags["vg"], "rootvg");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceTags(HashMap<String, Vec<Tags>>);

impl DeviceTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one tag set for `device`.
    pub fn add<K, V>(&mut self, device: &str, tags: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let set: Tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.0.entry(device.to_string()).or_default().push(set);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the tag overlays configured for `device`.
    pub fn overlays(&self, device: &str) -> &[Tags] {
        self.0.get(device).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Merges the overlays for `device` into `tags`.
    pub fn apply(&self, device: &str, tags: &mut Tags) {
        for overlay in self.overlays(device) {
            for (k, v) in overlay {
                tags.insert(k.clone(), v.clone());
            }
        }
    }

    /// Builds the full tag set for a record: the `device` tag plus any
    /// overlays. Records without a device get no tags at all.
    pub fn resolve(&self, device: Option<&str>) -> Tags {
        let mut tags = Tags::new();
        if let Some(device) = device {
            tags.insert("device".to_string(), device.to_string());
            self.apply(device, &mut tags);
        }
        tags
    }
}

impl From<HashMap<String, Vec<Tags>>> for DeviceTags {
    fn from(map: HashMap<String, Vec<Tags>>) -> Self {
        Self(map)
    }
}
