//! Mosaic Tools settings adapter.
//!
//! The suite keeps one JSON settings file. Most of it is user preference
//! worth syncing, but a large block of window coordinates and local paths is
//! meaningful only on the machine that wrote it. Export filters that block
//! out of the whole document tree; import merges the incoming document over
//! the local one so those values survive.

use super::{AdapterError, DeviceAdapter, DeviceId, ExportStatus};
use crate::filter::{json, MachineKeySet};
use crate::process::ProcessLifecycleGuard;
use crate::util;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-window coordinates, helper paths, and the legacy single-window keys.
const MACHINE_KEYS: MachineKeySet = MachineKeySet::new(&[
    "window_x",
    "window_y",
    "clinical_history_x",
    "clinical_history_y",
    "impression_x",
    "impression_y",
    "floating_toolbar_x",
    "floating_toolbar_y",
    "indicator_x",
    "indicator_y",
    "report_popup_x",
    "report_popup_y",
    "settings_x",
    "settings_y",
    "pick_list_popup_x",
    "pick_list_popup_y",
    "rvucounter_path",
    "ExePath",
    "Mic Indicator EXE",
    "PosX",
    "PosY",
    "WindowX",
    "WindowY",
    "LastDirectory",
    "MachineName",
]);

const SETTINGS_FILE: &str = "MosaicToolsSettings.json";

/// Filesystem and process locations of a Mosaic Tools installation.
#[derive(Debug, Clone)]
pub struct MosaicToolsPaths {
    /// Directory holding the settings file.
    pub config_dir: PathBuf,
    /// Process owning the file, also the source of the relaunch path.
    pub process_names: Vec<String>,
}

impl Default for MosaicToolsPaths {
    fn default() -> Self {
        let local = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            config_dir: local.join("MosaicTools"),
            process_names: vec!["MosaicTools".to_string()],
        }
    }
}

pub struct MosaicToolsAdapter {
    paths: MosaicToolsPaths,
    guard: ProcessLifecycleGuard,
}

impl MosaicToolsAdapter {
    #[must_use]
    pub fn new(paths: MosaicToolsPaths) -> Self {
        let guard = ProcessLifecycleGuard::new(paths.process_names.clone());
        Self { paths, guard }
    }

    fn settings_path(&self) -> PathBuf {
        self.paths.config_dir.join(SETTINGS_FILE)
    }

    fn capture_file(&self, capture_root: &Path) -> PathBuf {
        capture_root.join(self.capture_dir_name()).join(SETTINGS_FILE)
    }
}

#[async_trait]
impl DeviceAdapter for MosaicToolsAdapter {
    fn id(&self) -> DeviceId {
        DeviceId::MosaicTools
    }

    fn display_name(&self) -> &'static str {
        "Mosaic Tools Settings"
    }

    fn is_installed(&self) -> bool {
        self.settings_path().is_file()
    }

    async fn export(&self, capture_root: &Path) -> Result<ExportStatus, AdapterError> {
        let settings = self.settings_path();
        if !settings.is_file() {
            return Ok(ExportStatus::NothingToCapture);
        }

        let capture_dir = capture_root.join(self.capture_dir_name());
        fs::create_dir_all(&capture_dir).map_err(|e| AdapterError::io(&capture_dir, e))?;

        let raw = util::read_text_auto(&settings).map_err(|e| AdapterError::io(&settings, e))?;
        let outgoing = json::filter_str(&raw, &MACHINE_KEYS);

        let dest = capture_dir.join(SETTINGS_FILE);
        fs::write(&dest, outgoing).map_err(|e| AdapterError::io(&dest, e))?;
        Ok(ExportStatus::Captured)
    }

    async fn import(&self, capture_root: &Path) -> Result<(), AdapterError> {
        let capture_file = self.capture_file(capture_root);
        if !capture_file.is_file() {
            return Err(AdapterError::NoCaptureData {
                device: self.id(),
                path: capture_file,
            });
        }

        // The relaunch path exists only while the process is alive.
        let was_running = self.guard.is_running();
        let executable = if was_running {
            self.guard.executable_path()
        } else {
            None
        };
        if was_running {
            self.guard.stop().await;
        }

        let incoming =
            util::read_text_auto(&capture_file).map_err(|e| AdapterError::io(&capture_file, e))?;

        fs::create_dir_all(&self.paths.config_dir)
            .map_err(|e| AdapterError::io(&self.paths.config_dir, e))?;

        let settings = self.settings_path();
        let content = if settings.is_file() {
            let local = util::read_text_auto(&settings).map_err(|e| AdapterError::io(&settings, e))?;
            json::merge_str(&incoming, &local, &MACHINE_KEYS)
        } else {
            incoming
        };
        fs::write(&settings, content).map_err(|e| AdapterError::io(&settings, e))?;

        if was_running {
            if let Some(executable) = executable {
                self.guard.launch(&executable);
            }
        }
        Ok(())
    }

    fn has_config_data(&self, capture_root: &Path) -> bool {
        self.capture_file(capture_root).is_file()
    }
}
