//! Elgato Stream Deck capture adapter.
//!
//! Button layouts live under ProfilesV3 (with BackupV3 alongside) in the
//! roaming Elgato directory; plugins, logs, and caches stay local. Each
//! profile manifest binds to a deck by model and UUID, so profiles captured
//! on one machine would point at the source machine's deck. The adapter
//! caches the local deck identity next to the live profiles and rewrites
//! every manifest binding after an import.

use super::{run_blocking, AdapterError, DeviceAdapter, DeviceId, ExportStatus};
use crate::process::ProcessLifecycleGuard;
use crate::util;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Subfolders worth capturing; everything else is machine-local.
const ESSENTIAL_FOLDERS: [&str; 2] = ["ProfilesV3", "BackupV3"];
/// Identity cache file kept next to the live profiles.
const DEVICE_CACHE_FILE: &str = "rigsync_device_cache.json";
/// Profile directories are named `<uuid>.sdProfile`.
const PROFILE_DIR_SUFFIX: &str = ".sdProfile";

/// The deck a set of profiles is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckIdentity {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "UUID")]
    pub uuid: String,
}

/// Filesystem and process locations of a Stream Deck installation.
#[derive(Debug, Clone)]
pub struct StreamDeckPaths {
    /// Roaming application-data directory holding profiles and plugins.
    pub app_data_dir: PathBuf,
    /// Installed executable, used for relaunching.
    pub executable: PathBuf,
    /// Processes that must be down before profiles are touched.
    pub process_names: Vec<String>,
}

impl Default for StreamDeckPaths {
    fn default() -> Self {
        let roaming = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            app_data_dir: roaming.join("Elgato").join("StreamDeck"),
            executable: PathBuf::from(r"C:\Program Files\Elgato\StreamDeck\StreamDeck.exe"),
            process_names: vec!["StreamDeck".to_string()],
        }
    }
}

pub struct StreamDeckAdapter {
    paths: StreamDeckPaths,
    guard: ProcessLifecycleGuard,
}

impl StreamDeckAdapter {
    #[must_use]
    pub fn new(paths: StreamDeckPaths) -> Self {
        let guard = ProcessLifecycleGuard::new(paths.process_names.clone());
        Self { paths, guard }
    }
}

fn cached_identity(app_data: &Path) -> Option<DeckIdentity> {
    let raw = fs::read_to_string(app_data.join(DEVICE_CACHE_FILE)).ok()?;
    serde_json::from_str(&raw).ok()
}

fn save_identity_cache(app_data: &Path, identity: &DeckIdentity) {
    let Ok(json) = serde_json::to_string(identity) else {
        return;
    };
    if let Err(e) = fs::write(app_data.join(DEVICE_CACHE_FILE), json) {
        warn!(error = %e, "Could not write deck identity cache");
    }
}

fn profile_manifests(app_data: &Path) -> Vec<PathBuf> {
    let profiles_dir = app_data.join("ProfilesV3");
    let Ok(entries) = fs::read_dir(&profiles_dir) else {
        return Vec::new();
    };
    let mut manifests: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .map(|n| n.to_string_lossy().ends_with(PROFILE_DIR_SUFFIX))
                    .unwrap_or(false)
        })
        .map(|p| p.join("manifest.json"))
        .filter(|m| m.is_file())
        .collect();
    manifests.sort();
    manifests
}

/// Read the deck identity out of the first live profile manifest that has one.
fn identity_from_profiles(app_data: &Path) -> Option<DeckIdentity> {
    for manifest in profile_manifests(app_data) {
        let Ok(raw) = fs::read_to_string(&manifest) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        let Some(device) = value.get("Device") else {
            continue;
        };
        let model = device.get("Model").and_then(Value::as_str).unwrap_or("");
        let uuid = device.get("UUID").and_then(Value::as_str).unwrap_or("");
        if !model.is_empty() && !uuid.is_empty() {
            return Some(DeckIdentity {
                model: model.to_string(),
                uuid: uuid.to_string(),
            });
        }
    }
    None
}

/// Point every live profile manifest at `identity`. Per-manifest failures
/// are logged and skipped.
fn rebind_profiles(app_data: &Path, identity: &DeckIdentity) {
    for manifest in profile_manifests(app_data) {
        let Ok(raw) = fs::read_to_string(&manifest) else {
            warn!(path = %manifest.display(), "Could not read manifest for rebinding");
            continue;
        };
        let Ok(mut value) = serde_json::from_str::<Value>(&raw) else {
            warn!(path = %manifest.display(), "Manifest is not valid JSON; leaving binding as captured");
            continue;
        };
        let Some(map) = value.as_object_mut() else {
            continue;
        };
        map.insert(
            "Device".to_string(),
            json!({ "Model": identity.model, "UUID": identity.uuid }),
        );
        let Ok(updated) = serde_json::to_string(&value) else {
            continue;
        };
        if let Err(e) = fs::write(&manifest, updated) {
            warn!(path = %manifest.display(), error = %e, "Could not rewrite manifest binding");
        }
    }
}

#[async_trait]
impl DeviceAdapter for StreamDeckAdapter {
    fn id(&self) -> DeviceId {
        DeviceId::StreamDeck
    }

    fn display_name(&self) -> &'static str {
        "Elgato Stream Deck"
    }

    fn is_installed(&self) -> bool {
        self.paths.executable.exists() || self.paths.app_data_dir.is_dir()
    }

    async fn export(&self, capture_root: &Path) -> Result<ExportStatus, AdapterError> {
        if !self.paths.app_data_dir.is_dir() {
            return Ok(ExportStatus::NothingToCapture);
        }

        let was_running = self.guard.stop().await;

        let app_data = self.paths.app_data_dir.clone();
        let capture_dir = capture_root.join(self.capture_dir_name());

        let copied_folders = run_blocking(move || {
            // Record which deck the live profiles belong to while they are
            // still here to ask.
            if let Some(identity) = identity_from_profiles(&app_data) {
                save_identity_cache(&app_data, &identity);
            }

            util::clear_dir(&capture_dir).map_err(|e| AdapterError::io(&capture_dir, e))?;

            let mut copied = 0;
            for folder in ESSENTIAL_FOLDERS {
                let source = app_data.join(folder);
                if source.is_dir() {
                    let dest = capture_dir.join(folder);
                    util::copy_dir_recursive(&source, &dest)
                        .map_err(|e| AdapterError::io(&dest, e))?;
                    copied += 1;
                }
            }
            Ok(copied)
        })
        .await?;

        if was_running {
            self.guard.launch(&self.paths.executable);
        }

        if copied_folders > 0 {
            Ok(ExportStatus::Captured)
        } else {
            Ok(ExportStatus::NothingToCapture)
        }
    }

    async fn import(&self, capture_root: &Path) -> Result<(), AdapterError> {
        let capture_dir = capture_root.join(self.capture_dir_name());
        if !self.has_config_data(capture_root) {
            return Err(AdapterError::NoCaptureData {
                device: self.id(),
                path: capture_dir,
            });
        }

        self.guard.stop().await;

        let app_data = self.paths.app_data_dir.clone();

        run_blocking(move || {
            // The local identity must be read before the live profiles are
            // replaced; the cache survives where the manifests do not.
            let identity = cached_identity(&app_data).or_else(|| {
                let found = identity_from_profiles(&app_data);
                if let Some(ref identity) = found {
                    save_identity_cache(&app_data, identity);
                }
                found
            });

            for folder in ESSENTIAL_FOLDERS {
                let source = capture_dir.join(folder);
                if !source.is_dir() {
                    continue;
                }
                let dest = app_data.join(folder);
                if dest.exists() {
                    if let Err(e) = fs::remove_dir_all(&dest) {
                        warn!(path = %dest.display(), error = %e, "Could not clear live folder before restore");
                    }
                }
                util::copy_dir_recursive(&source, &dest)
                    .map_err(|e| AdapterError::io(&dest, e))?;
            }

            if let Some(identity) = identity {
                rebind_profiles(&app_data, &identity);
            }
            Ok(())
        })
        .await?;

        self.guard.launch(&self.paths.executable);
        Ok(())
    }
}
