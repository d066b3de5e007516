//! Device operation CLI commands
//!
//! Handles: rigsync save/apply/backup/revert/status/devices

use serde_json::json;

use rigsync_core::device::builtin_adapters;
use rigsync_core::{
    AppSettings, DeviceId, DeviceOutcome, Profile, SyncCoordinator, SyncReport, SyncRoot,
};

/// Capture live device configuration into a profile.
pub async fn save(
    root: SyncRoot,
    profile: Option<String>,
    explicit: &[DeviceId],
) -> anyhow::Result<()> {
    let mut settings = AppSettings::load(&root);
    let profile_name = profile.unwrap_or_else(|| settings.last_selected_profile.clone());

    let coordinator = SyncCoordinator::new(root.clone())?;
    let existing = coordinator.store().get(&profile_name)?;
    let devices = batch_devices(explicit, existing.as_ref(), &settings);

    println!("Saving to profile '{profile_name}'");
    let report = coordinator.save_all(&profile_name, &devices).await?;
    print_report(&coordinator, &report);

    settings.last_selected_profile = profile_name;
    settings.save(&root)?;

    ensure_batch_succeeded(&report)
}

/// Write a profile's captured configuration onto this machine.
pub async fn apply(
    root: SyncRoot,
    profile: Option<String>,
    explicit: &[DeviceId],
) -> anyhow::Result<()> {
    let mut settings = AppSettings::load(&root);
    let profile_name = profile.unwrap_or_else(|| settings.last_selected_profile.clone());

    let coordinator = SyncCoordinator::new(root.clone())?;
    let existing = coordinator.store().get(&profile_name)?;
    let devices = batch_devices(explicit, existing.as_ref(), &settings);

    println!("Applying profile '{profile_name}'");
    let report = coordinator.apply_all(&profile_name, &devices).await?;
    print_report(&coordinator, &report);

    settings.last_selected_profile = profile_name;
    settings.save(&root)?;

    ensure_batch_succeeded(&report)
}

/// Snapshot one device's live configuration into the revert vault.
pub async fn backup(root: SyncRoot, device: DeviceId) -> anyhow::Result<()> {
    let coordinator = SyncCoordinator::new(root)?;
    match coordinator.backup_device(device).await {
        DeviceOutcome::Failed(reason) => anyhow::bail!("backup of {device} failed: {reason}"),
        outcome => println!("{device}: {outcome}"),
    }
    Ok(())
}

/// Restore one device's live configuration from the revert vault.
pub async fn revert(root: SyncRoot, device: DeviceId) -> anyhow::Result<()> {
    let coordinator = SyncCoordinator::new(root)?;
    match coordinator.revert_device(device).await {
        DeviceOutcome::Failed(reason) => anyhow::bail!("revert of {device} failed: {reason}"),
        outcome => println!("{device}: {outcome}"),
    }
    Ok(())
}

/// Show the sync root, known profiles, and per-device state.
pub fn status(root: SyncRoot, json_output: bool) -> anyhow::Result<()> {
    let settings = AppSettings::load(&root);
    let base = root.base().to_path_buf();

    let coordinator = SyncCoordinator::new(root)?;
    let profiles = coordinator.store().list()?;
    let statuses = coordinator.device_status();
    let manifest = coordinator.vault().manifest();

    if json_output {
        let devices: Vec<serde_json::Value> = statuses
            .iter()
            .map(|status| {
                json!({
                    "id": status.id.as_str(),
                    "name": status.display_name,
                    "installed": status.installed,
                    "hasBackup": status.has_backup,
                    "backupTakenAt": manifest
                        .devices
                        .get(&status.id)
                        .map(|slot| slot.created_at.to_rfc3339()),
                })
            })
            .collect();

        let output = json!({
            "root": base.display().to_string(),
            "lastSelectedProfile": settings.last_selected_profile,
            "profiles": profiles,
            "devices": devices,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Sync root: {}", base.display());
    println!("Last selected profile: {}", settings.last_selected_profile);
    println!("Profiles: {}", profiles.join(", "));
    println!("\nDevices:");
    for status in &statuses {
        let installed = if status.installed {
            "installed"
        } else {
            "not installed"
        };
        let backup_note = match manifest.devices.get(&status.id) {
            Some(slot) => format!("backup from {}", slot.created_at.format("%Y-%m-%d %H:%M")),
            None if status.has_backup => "backup available".to_string(),
            None => "no backup".to_string(),
        };
        println!("  {:<26} {installed:<14} {backup_note}", status.display_name);
    }
    Ok(())
}

/// List devices and optionally flip their persisted default-enabled state.
pub fn devices(root: &SyncRoot, enable: &[DeviceId], disable: &[DeviceId]) -> anyhow::Result<()> {
    let mut settings = AppSettings::load(root);

    if !enable.is_empty() || !disable.is_empty() {
        for &device in enable {
            settings.set_device_enabled(device, true);
        }
        for &device in disable {
            settings.set_device_enabled(device, false);
        }
        settings.save(root)?;
    }

    println!("Devices:");
    for adapter in builtin_adapters() {
        let device = adapter.id();
        let state = if settings.is_device_enabled(device) {
            "enabled"
        } else {
            "disabled"
        };
        println!(
            "  {:<15} {:<26} {state}",
            device.as_str(),
            adapter.display_name()
        );
    }
    Ok(())
}

/// Devices for a batch: explicit flags win, then the profile's own enabled
/// map, then the persisted defaults.
fn batch_devices(
    explicit: &[DeviceId],
    profile: Option<&Profile>,
    settings: &AppSettings,
) -> Vec<DeviceId> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }
    match profile {
        Some(profile) => DeviceId::ALL
            .into_iter()
            .filter(|device| profile.is_enabled(*device))
            .collect(),
        None => settings.enabled_devices(),
    }
}

fn print_report(coordinator: &SyncCoordinator, report: &SyncReport) {
    for (device, outcome) in report.iter() {
        println!("  {:<26} {outcome}", display_name(coordinator, device));
    }
}

fn display_name(coordinator: &SyncCoordinator, device: DeviceId) -> &'static str {
    coordinator
        .adapters()
        .find(|adapter| adapter.id() == device)
        .map_or("unknown device", |adapter| adapter.display_name())
}

fn ensure_batch_succeeded(report: &SyncReport) -> anyhow::Result<()> {
    let failed = report
        .iter()
        .filter(|(_, outcome)| !outcome.succeeded())
        .count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} devices failed", report.iter().count());
    }
    Ok(())
}
