//! Profile metadata record.

use crate::device::DeviceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata stored as `profile.json` inside each profile directory.
///
/// The enabled-device map is keyed by device wire name so files written by
/// older builds, or hand-edited ones carrying unknown keys, keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Matches the directory name.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default = "all_devices_enabled")]
    pub enabled_devices: BTreeMap<String, bool>,
    #[serde(default)]
    pub notes: String,
}

fn all_devices_enabled() -> BTreeMap<String, bool> {
    DeviceId::ALL
        .iter()
        .map(|device| (device.as_str().to_string(), true))
        .collect()
}

impl Profile {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            last_modified: now,
            enabled_devices: all_devices_enabled(),
            notes: String::new(),
        }
    }

    /// Devices absent from the map count as enabled, matching the initial
    /// all-true state.
    #[must_use]
    pub fn is_enabled(&self, device: DeviceId) -> bool {
        self.enabled_devices
            .get(device.as_str())
            .copied()
            .unwrap_or(true)
    }

    pub fn set_enabled(&mut self, device: DeviceId, enabled: bool) {
        self.enabled_devices
            .insert(device.as_str().to_string(), enabled);
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}
