//! Application preferences persisted at the sync root.
//!
//! `settings.json` remembers what the user last had selected so a fresh
//! session starts where the previous one left off. Loading is fail-soft: a
//! missing or unreadable file just yields defaults.

use crate::device::DeviceId;
use crate::layout::SyncRoot;
use crate::util;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Carried for compatibility with existing settings files; the active
    /// root is chosen by the caller, not re-read from here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_path: Option<PathBuf>,
    #[serde(default = "default_profile_name")]
    pub last_selected_profile: String,
    #[serde(default)]
    pub run_on_startup: bool,
    #[serde(default)]
    pub auto_apply_on_startup: bool,
    /// Per-device enable toggles, keyed by device wire name.
    #[serde(default = "all_devices_enabled")]
    pub device_states: BTreeMap<String, bool>,
}

fn default_profile_name() -> String {
    crate::profile::DEFAULT_PROFILE.to_string()
}

fn all_devices_enabled() -> BTreeMap<String, bool> {
    DeviceId::ALL
        .iter()
        .map(|device| (device.as_str().to_string(), true))
        .collect()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            profiles_path: None,
            last_selected_profile: default_profile_name(),
            run_on_startup: false,
            auto_apply_on_startup: false,
            device_states: all_devices_enabled(),
        }
    }
}

impl AppSettings {
    /// Load the settings file, falling back to defaults when it is missing
    /// or unreadable.
    #[must_use]
    pub fn load(root: &SyncRoot) -> Self {
        let path = root.settings_path();
        if !path.is_file() {
            return Self::default();
        }
        match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Settings file did not parse, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Settings file unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Persist the settings atomically.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, root: &SyncRoot) -> Result<(), SettingsError> {
        let path = root.settings_path();
        util::write_json_atomic(&path, self).map_err(|source| SettingsError::Io { path, source })
    }

    /// Devices absent from the map count as enabled.
    #[must_use]
    pub fn is_device_enabled(&self, device: DeviceId) -> bool {
        self.device_states
            .get(device.as_str())
            .copied()
            .unwrap_or(true)
    }

    pub fn set_device_enabled(&mut self, device: DeviceId, enabled: bool) {
        self.device_states
            .insert(device.as_str().to_string(), enabled);
    }

    /// The ids currently toggled on, in registry order.
    #[must_use]
    pub fn enabled_devices(&self) -> Vec<DeviceId> {
        DeviceId::ALL
            .into_iter()
            .filter(|device| self.is_device_enabled(*device))
            .collect()
    }
}
