//! Batch orchestration across device adapters.
//!
//! The coordinator owns the adapter registry, the profile store, and the
//! backup vault. Batches run sequentially over the registry and convert
//! every per-device failure into a reported outcome, so one bad device never
//! aborts the rest. A per-device lock serializes apply/backup/revert on the
//! same device; a per-profile lock serializes metadata rewrites.

use crate::device::{builtin_adapters, DeviceAdapter, DeviceId, ExportStatus};
use crate::layout::SyncRoot;
use crate::profile::store::ensure_valid_name;
use crate::profile::{Profile, ProfileStore, StoreError};
use crate::vault::BackupVault;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// What happened to one device during a batch or single-device operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    /// Live state captured into the profile or vault.
    Saved,
    /// Profile capture written to the live location.
    Applied,
    /// Vault slot written back to the live location.
    Reverted,
    /// Device was not enabled for the batch.
    Skipped,
    /// Nothing live to capture (not installed or never configured).
    NothingToCapture,
    /// The profile holds no capture for this device.
    NoData,
    Failed(String),
}

impl DeviceOutcome {
    /// Everything short of an actual failure counts as success.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !matches!(self, DeviceOutcome::Failed(_))
    }
}

impl fmt::Display for DeviceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceOutcome::Saved => write!(f, "saved"),
            DeviceOutcome::Applied => write!(f, "applied"),
            DeviceOutcome::Reverted => write!(f, "reverted"),
            DeviceOutcome::Skipped => write!(f, "skipped"),
            DeviceOutcome::NothingToCapture => write!(f, "nothing to capture"),
            DeviceOutcome::NoData => write!(f, "no saved data"),
            DeviceOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Per-device outcomes of one batch, in registry order.
#[derive(Debug, Default)]
pub struct SyncReport {
    outcomes: BTreeMap<DeviceId, DeviceOutcome>,
}

impl SyncReport {
    fn record(&mut self, device: DeviceId, outcome: DeviceOutcome) {
        self.outcomes.insert(device, outcome);
    }

    #[must_use]
    pub fn outcome(&self, device: DeviceId) -> Option<&DeviceOutcome> {
        self.outcomes.get(&device)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, &DeviceOutcome)> {
        self.outcomes.iter().map(|(device, outcome)| (*device, outcome))
    }

    /// True when no device outcome is a failure.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcomes.values().all(DeviceOutcome::succeeded)
    }
}

/// Installation and backup state of one device, for status displays.
#[derive(Debug, Clone)]
pub struct DeviceStatus {
    pub id: DeviceId,
    pub display_name: &'static str,
    pub installed: bool,
    pub has_backup: bool,
}

struct Registered {
    adapter: Arc<dyn DeviceAdapter>,
    lock: Mutex<()>,
}

pub struct SyncCoordinator {
    devices: Vec<Registered>,
    store: ProfileStore,
    vault: BackupVault,
    profile_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SyncCoordinator {
    /// Open a coordinator over the built-in adapter registry.
    ///
    /// # Errors
    /// Returns an error if the profile store cannot be opened.
    pub fn new(root: SyncRoot) -> Result<Self, StoreError> {
        Self::with_adapters(root, builtin_adapters())
    }

    /// Open a coordinator over an explicit adapter set. Tests use this to
    /// point adapters at temp directories.
    ///
    /// # Errors
    /// Returns an error if the profile store cannot be opened.
    pub fn with_adapters(
        root: SyncRoot,
        adapters: Vec<Arc<dyn DeviceAdapter>>,
    ) -> Result<Self, StoreError> {
        let vault = BackupVault::new(root.backup_dir());
        let store = ProfileStore::open(root)?;
        let devices = adapters
            .into_iter()
            .map(|adapter| Registered {
                adapter,
                lock: Mutex::new(()),
            })
            .collect();
        Ok(Self {
            devices,
            store,
            vault,
            profile_locks: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    #[must_use]
    pub fn vault(&self) -> &BackupVault {
        &self.vault
    }

    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn DeviceAdapter>> {
        self.devices.iter().map(|registered| &registered.adapter)
    }

    fn registered(&self, device: DeviceId) -> Option<&Registered> {
        self.devices
            .iter()
            .find(|registered| registered.adapter.id() == device)
    }

    async fn profile_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.profile_locks.lock().await;
        locks.entry(name.to_string()).or_default().clone()
    }

    /// Capture every enabled device's live state into the profile, then
    /// rewrite the profile's enabled-device map to exactly the passed set.
    /// Missing profile metadata is created on the fly.
    ///
    /// # Errors
    /// Returns an error if the profile name is invalid or the metadata
    /// rewrite fails; per-device trouble is reported in the outcomes instead.
    pub async fn save_all(
        &self,
        profile_name: &str,
        enabled: &[DeviceId],
    ) -> Result<SyncReport, StoreError> {
        ensure_valid_name(profile_name)?;
        let lock = self.profile_lock(profile_name).await;
        let _profile_guard = lock.lock().await;

        let profile_dir = self.store.profile_dir(profile_name);
        let enabled_set: BTreeSet<DeviceId> = enabled.iter().copied().collect();
        let mut report = SyncReport::default();

        for registered in &self.devices {
            let device = registered.adapter.id();
            if !enabled_set.contains(&device) {
                report.record(device, DeviceOutcome::Skipped);
                continue;
            }
            let _device_guard = registered.lock.lock().await;
            let outcome = match registered.adapter.export(&profile_dir).await {
                Ok(ExportStatus::Captured) => DeviceOutcome::Saved,
                Ok(ExportStatus::NothingToCapture) => DeviceOutcome::NothingToCapture,
                Err(e) => {
                    warn!(device = %device, error = %e, "Save failed");
                    DeviceOutcome::Failed(e.to_string())
                }
            };
            report.record(device, outcome);
        }

        let mut profile = self
            .store
            .get(profile_name)?
            .unwrap_or_else(|| Profile::new(profile_name));
        for registered in &self.devices {
            let device = registered.adapter.id();
            profile.set_enabled(device, enabled_set.contains(&device));
        }
        self.store.save(&mut profile)?;

        info!(profile = profile_name, "Save batch finished");
        Ok(report)
    }

    /// Apply a profile's captures to this machine. Each enabled device with
    /// saved data is snapshotted into the vault first, then imported.
    ///
    /// # Errors
    /// Returns an error if the profile name is invalid or the profile does
    /// not exist; per-device trouble is reported in the outcomes instead.
    pub async fn apply_all(
        &self,
        profile_name: &str,
        enabled: &[DeviceId],
    ) -> Result<SyncReport, StoreError> {
        ensure_valid_name(profile_name)?;
        let lock = self.profile_lock(profile_name).await;
        let _profile_guard = lock.lock().await;

        let profile_dir = self.store.profile_dir(profile_name);
        if !profile_dir.is_dir() {
            return Err(StoreError::NotFound(profile_name.to_string()));
        }

        let enabled_set: BTreeSet<DeviceId> = enabled.iter().copied().collect();
        let mut report = SyncReport::default();

        for registered in &self.devices {
            let device = registered.adapter.id();
            if !enabled_set.contains(&device) {
                report.record(device, DeviceOutcome::Skipped);
                continue;
            }
            let _device_guard = registered.lock.lock().await;
            if !registered.adapter.has_config_data(&profile_dir) {
                report.record(device, DeviceOutcome::NoData);
                continue;
            }

            // Safety net first; a failed snapshot never blocks the apply.
            if let Err(e) = self.vault.snapshot(registered.adapter.as_ref()).await {
                warn!(device = %device, error = %e, "Backup before apply failed");
            }

            let outcome = match registered.adapter.import(&profile_dir).await {
                Ok(()) => DeviceOutcome::Applied,
                Err(e) => {
                    warn!(device = %device, error = %e, "Apply failed");
                    DeviceOutcome::Failed(e.to_string())
                }
            };
            report.record(device, outcome);
        }

        info!(profile = profile_name, "Apply batch finished");
        Ok(report)
    }

    /// Snapshot one device's live state into the vault.
    pub async fn backup_device(&self, device: DeviceId) -> DeviceOutcome {
        let Some(registered) = self.registered(device) else {
            return DeviceOutcome::Failed(format!("device {device} is not registered"));
        };
        let _device_guard = registered.lock.lock().await;
        match self.vault.snapshot(registered.adapter.as_ref()).await {
            Ok(ExportStatus::Captured) => DeviceOutcome::Saved,
            Ok(ExportStatus::NothingToCapture) => DeviceOutcome::NothingToCapture,
            Err(e) => {
                warn!(device = %device, error = %e, "Backup failed");
                DeviceOutcome::Failed(e.to_string())
            }
        }
    }

    /// Write one device's vault slot back to its live location. Fails when
    /// the slot is empty.
    pub async fn revert_device(&self, device: DeviceId) -> DeviceOutcome {
        let Some(registered) = self.registered(device) else {
            return DeviceOutcome::Failed(format!("device {device} is not registered"));
        };
        let _device_guard = registered.lock.lock().await;
        if !self.vault.has_backup(registered.adapter.as_ref()) {
            return DeviceOutcome::Failed("no backup captured for this device".to_string());
        }
        match self.vault.restore(registered.adapter.as_ref()).await {
            Ok(()) => DeviceOutcome::Reverted,
            Err(e) => {
                warn!(device = %device, error = %e, "Revert failed");
                DeviceOutcome::Failed(e.to_string())
            }
        }
    }

    /// Whether the vault holds a slot for the device.
    #[must_use]
    pub fn has_backup(&self, device: DeviceId) -> bool {
        self.registered(device)
            .is_some_and(|registered| self.vault.has_backup(registered.adapter.as_ref()))
    }

    /// Installation and backup state of every registered device.
    #[must_use]
    pub fn device_status(&self) -> Vec<DeviceStatus> {
        self.devices
            .iter()
            .map(|registered| DeviceStatus {
                id: registered.adapter.id(),
                display_name: registered.adapter.display_name(),
                installed: registered.adapter.is_installed(),
                has_backup: self.vault.has_backup(registered.adapter.as_ref()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success_contract() {
        assert!(DeviceOutcome::Saved.succeeded());
        assert!(DeviceOutcome::Skipped.succeeded());
        assert!(DeviceOutcome::NoData.succeeded());
        assert!(DeviceOutcome::NothingToCapture.succeeded());
        assert!(!DeviceOutcome::Failed("boom".to_string()).succeeded());
    }

    #[test]
    fn test_report_collapses_to_boolean() {
        let mut report = SyncReport::default();
        report.record(DeviceId::Logitech, DeviceOutcome::Saved);
        report.record(DeviceId::SpeechMic, DeviceOutcome::Skipped);
        assert!(report.succeeded());

        report.record(DeviceId::StreamDeck, DeviceOutcome::Failed("x".to_string()));
        assert!(!report.succeeded());
        assert_eq!(
            report.outcome(DeviceId::SpeechMic),
            Some(&DeviceOutcome::Skipped)
        );
    }
}
