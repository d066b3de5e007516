//! Mosaic Combined Hotkeys capture adapter.
//!
//! A single HotkeyConfig.ini, written by the utility as UTF-16 LE, carries
//! every hotkey binding plus a few workstation-local values (window
//! position, helper executable paths). Export strips those; import overlays
//! the local machine's values back over the incoming file. The utility gets
//! installed to user-chosen locations, so the relaunch path is read from the
//! running process before it is stopped.

use super::{AdapterError, DeviceAdapter, DeviceId, ExportStatus};
use crate::filter::{ini, IniDocument, MachineKeySet};
use crate::process::ProcessLifecycleGuard;
use crate::util;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Workstation-local keys never carried between machines. User Name and
/// AutoStart travel intentionally: same person, same preference.
const MACHINE_KEYS: MachineKeySet =
    MachineKeySet::new(&["Mic Indicator EXE", "ExePath", "PosX", "PosY"]);

const CONFIG_FILE: &str = "HotkeyConfig.ini";

/// Filesystem and process locations of a Combined Hotkeys installation.
#[derive(Debug, Clone)]
pub struct MosaicHotkeysPaths {
    /// The live INI file.
    pub config_path: PathBuf,
    /// Process owning the file, also the source of the relaunch path.
    pub process_names: Vec<String>,
}

impl Default for MosaicHotkeysPaths {
    fn default() -> Self {
        let local = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            config_path: local.join("MosaicCombinedTools").join(CONFIG_FILE),
            process_names: vec!["Mosaic Combined Hotkeys".to_string()],
        }
    }
}

pub struct MosaicHotkeysAdapter {
    paths: MosaicHotkeysPaths,
    guard: ProcessLifecycleGuard,
}

impl MosaicHotkeysAdapter {
    #[must_use]
    pub fn new(paths: MosaicHotkeysPaths) -> Self {
        let guard = ProcessLifecycleGuard::new(paths.process_names.clone());
        Self { paths, guard }
    }

    fn capture_file(&self, capture_root: &Path) -> PathBuf {
        capture_root.join(self.capture_dir_name()).join(CONFIG_FILE)
    }
}

#[async_trait]
impl DeviceAdapter for MosaicHotkeysAdapter {
    fn id(&self) -> DeviceId {
        DeviceId::MosaicHotkeys
    }

    fn display_name(&self) -> &'static str {
        "Mosaic Combined Hotkeys"
    }

    fn is_installed(&self) -> bool {
        self.paths.config_path.is_file()
    }

    async fn export(&self, capture_root: &Path) -> Result<ExportStatus, AdapterError> {
        if !self.paths.config_path.is_file() {
            return Ok(ExportStatus::NothingToCapture);
        }

        let capture_dir = capture_root.join(self.capture_dir_name());
        fs::create_dir_all(&capture_dir).map_err(|e| AdapterError::io(&capture_dir, e))?;

        let raw = util::read_text_auto(&self.paths.config_path)
            .map_err(|e| AdapterError::io(&self.paths.config_path, e))?;

        let document = IniDocument::parse(&raw);
        let outgoing = if document.is_empty() && !raw.trim().is_empty() {
            warn!(path = %self.paths.config_path.display(), "Hotkey config did not parse; capturing it verbatim");
            raw
        } else {
            let mut document = document;
            ini::filter_for_export(&mut document, &MACHINE_KEYS);
            document.render()
        };

        let dest = capture_dir.join(CONFIG_FILE);
        util::write_text_utf16_le(&dest, &outgoing).map_err(|e| AdapterError::io(&dest, e))?;
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

        let incoming_raw =
            util::read_text_auto(&capture_file).map_err(|e| AdapterError::io(&capture_file, e))?;
        let incoming = IniDocument::parse(&incoming_raw);

        let local = if self.paths.config_path.is_file() {
            let local_raw = util::read_text_auto(&self.paths.config_path)
                .map_err(|e| AdapterError::io(&self.paths.config_path, e))?;
            IniDocument::parse(&local_raw)
        } else {
            IniDocument::default()
        };

        let content = if incoming.is_empty() && !incoming_raw.trim().is_empty() {
            warn!(path = %capture_file.display(), "Captured hotkey config did not parse; applying it verbatim");
            incoming_raw
        } else {
            ini::merge_for_import(incoming, &local, &MACHINE_KEYS).render()
        };

        if let Some(parent) = self.paths.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| AdapterError::io(parent, e))?;
        }
        util::write_text_utf16_le(&self.paths.config_path, &content)
            .map_err(|e| AdapterError::io(&self.paths.config_path, e))?;

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
