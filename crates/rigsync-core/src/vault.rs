//! Backup vault: the single revert slot per device.
//!
//! Before a profile is applied, the live state of each affected device is
//! captured into the vault so one bad apply can be undone. The vault holds
//! exactly one slot per device; a new snapshot replaces the previous one.
//!
//! A `vault.json` sidecar next to the device folders records when each slot
//! was written, how many files it holds, and a content digest. The sidecar is
//! informational: slot presence is always decided by looking at the capture
//! folders themselves, and a missing or corrupt sidecar never fails an
//! operation.

use crate::device::{AdapterError, DeviceAdapter, DeviceId, ExportStatus};
use crate::util;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const MANIFEST_FILE: &str = "vault.json";

/// Sidecar record for one device slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSlot {
    pub created_at: DateTime<Utc>,
    pub file_count: usize,
    pub content_digest: String,
}

/// The whole sidecar file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultManifest {
    #[serde(default)]
    pub devices: BTreeMap<DeviceId, VaultSlot>,
}

pub struct BackupVault {
    dir: PathBuf,
}

impl BackupVault {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Capture the device's live state into its vault slot, replacing any
    /// previous snapshot, and refresh the sidecar.
    ///
    /// # Errors
    /// Returns an error if the adapter's export fails.
    pub async fn snapshot(
        &self,
        adapter: &dyn DeviceAdapter,
    ) -> Result<ExportStatus, AdapterError> {
        let status = adapter.export(&self.dir).await?;
        self.record_slot(adapter);
        Ok(status)
    }

    /// Write the device's vault slot back to its live location.
    ///
    /// # Errors
    /// Returns [`AdapterError::NoCaptureData`] when the slot is empty, or the
    /// adapter's import error.
    pub async fn restore(&self, adapter: &dyn DeviceAdapter) -> Result<(), AdapterError> {
        adapter.import(&self.dir).await
    }

    /// Whether the device's slot holds anything to revert to.
    #[must_use]
    pub fn has_backup(&self, adapter: &dyn DeviceAdapter) -> bool {
        adapter.has_config_data(&self.dir)
    }

    /// Read the sidecar, yielding an empty manifest when it is missing or
    /// does not parse.
    #[must_use]
    pub fn manifest(&self) -> VaultManifest {
        let path = self.manifest_path();
        if !path.is_file() {
            return VaultManifest::default();
        }
        match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Vault manifest did not parse, ignoring it");
                    VaultManifest::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Vault manifest unreadable, ignoring it");
                VaultManifest::default()
            }
        }
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Bring the sidecar in line with the slot's on-disk state. Best effort.
    fn record_slot(&self, adapter: &dyn DeviceAdapter) {
        let mut manifest = self.manifest();
        let slot_dir = self.dir.join(adapter.capture_dir_name());
        if util::dir_has_entries(&slot_dir) {
            let (file_count, content_digest) = util::digest_dir(&slot_dir);
            manifest.devices.insert(
                adapter.id(),
                VaultSlot {
                    created_at: Utc::now(),
                    file_count,
                    content_digest,
                },
            );
        } else {
            manifest.devices.remove(&adapter.id());
        }

        if let Err(e) = util::write_json_atomic(&self.manifest_path(), &manifest) {
            warn!(error = %e, "Failed to update the vault manifest");
        }
    }
}
