//! Coordinator batch tests
//!
//! End-to-end save/apply/backup/revert flows over real adapters pointed at
//! temp directories. Only the file-based adapters are registered here so no
//! process control is involved.

use rigsync_core::device::{
    DeviceAdapter, MosaicHotkeysAdapter, MosaicHotkeysPaths, MosaicToolsAdapter, MosaicToolsPaths,
    SpeechMicAdapter, SpeechMicPaths,
};
use rigsync_core::{DeviceId, DeviceOutcome, StoreError, SyncCoordinator, SyncRoot};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn adapters_over(live: &Path) -> Vec<Arc<dyn DeviceAdapter>> {
    vec![
        Arc::new(SpeechMicAdapter::new(SpeechMicPaths {
            config_dir: live.join("pdcc"),
            executable: live.join("pdcc").join("PDCC.exe"),
        })),
        Arc::new(MosaicHotkeysAdapter::new(MosaicHotkeysPaths {
            config_path: live.join("hotkeys").join("HotkeyConfig.ini"),
            process_names: Vec::new(),
        })),
        Arc::new(MosaicToolsAdapter::new(MosaicToolsPaths {
            config_dir: live.join("tools"),
            process_names: Vec::new(),
        })),
    ]
}

fn coordinator_over(sync_base: PathBuf, live: &Path) -> SyncCoordinator {
    SyncCoordinator::with_adapters(SyncRoot::new(sync_base), adapters_over(live))
        .expect("Failed to open coordinator")
}

fn seed_mic(live: &Path, body: &str) {
    fs::create_dir_all(live.join("pdcc")).expect("Failed to create mic config dir");
    fs::write(live.join("pdcc").join("Settings.xml"), body).expect("Failed to write mic config");
}

fn seed_hotkeys(live: &Path, body: &str) {
    fs::create_dir_all(live.join("hotkeys")).expect("Failed to create hotkeys dir");
    fs::write(live.join("hotkeys").join("HotkeyConfig.ini"), body)
        .expect("Failed to write hotkey config");
}

fn seed_tools(live: &Path, body: &str) {
    fs::create_dir_all(live.join("tools")).expect("Failed to create tools dir");
    fs::write(live.join("tools").join("MosaicToolsSettings.json"), body)
        .expect("Failed to write tools settings");
}

fn read_mic(live: &Path) -> String {
    fs::read_to_string(live.join("pdcc").join("Settings.xml")).expect("Missing mic config")
}

fn read_utf16(path: &Path) -> String {
    let bytes = fs::read(path).expect("Missing file");
    assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
    let units: Vec<u16> = bytes[2..]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

// =============================================================================
// Save
// =============================================================================

#[tokio::test]
async fn test_save_all_captures_enabled_and_skips_disabled() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let live = tmp.path().join("machine");
    seed_mic(&live, "<mic/>");
    seed_hotkeys(&live, "[Settings]\nF1=dictate\n");
    seed_tools(&live, r#"{ "theme": "dark" }"#);

    let coordinator = coordinator_over(tmp.path().join("sync"), &live);
    let report = coordinator
        .save_all("Default", &[DeviceId::SpeechMic, DeviceId::MosaicHotkeys])
        .await
        .expect("Save batch failed");

    assert!(report.succeeded());
    assert_eq!(report.outcome(DeviceId::SpeechMic), Some(&DeviceOutcome::Saved));
    assert_eq!(
        report.outcome(DeviceId::MosaicHotkeys),
        Some(&DeviceOutcome::Saved)
    );
    assert_eq!(
        report.outcome(DeviceId::MosaicTools),
        Some(&DeviceOutcome::Skipped)
    );

    let profile_dir = coordinator.store().profile_dir("Default");
    assert!(profile_dir.join("speechmic").join("Settings.xml").is_file());
    assert!(profile_dir
        .join("mosaichotkeys")
        .join("HotkeyConfig.ini")
        .is_file());
    assert!(!profile_dir.join("mosaictools").exists());
}

#[tokio::test]
async fn test_save_all_rewrites_enabled_devices_exactly() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let live = tmp.path().join("machine");
    seed_mic(&live, "<mic/>");

    let coordinator = coordinator_over(tmp.path().join("sync"), &live);

    coordinator
        .save_all(
            "Default",
            &[DeviceId::SpeechMic, DeviceId::MosaicHotkeys, DeviceId::MosaicTools],
        )
        .await
        .expect("Save batch failed");

    // A second save with a narrower set must turn the others off.
    coordinator
        .save_all("Default", &[DeviceId::SpeechMic])
        .await
        .expect("Save batch failed");

    let profile = coordinator
        .store()
        .get("Default")
        .expect("Get failed")
        .expect("Missing profile");
    assert!(profile.is_enabled(DeviceId::SpeechMic));
    assert!(!profile.is_enabled(DeviceId::MosaicHotkeys));
    assert!(!profile.is_enabled(DeviceId::MosaicTools));
}

#[tokio::test]
async fn test_save_all_creates_missing_profile_metadata() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let live = tmp.path().join("machine");
    seed_mic(&live, "<mic/>");

    let coordinator = coordinator_over(tmp.path().join("sync"), &live);
    coordinator
        .save_all("Roaming", &[DeviceId::SpeechMic])
        .await
        .expect("Save batch failed");

    let profile = coordinator
        .store()
        .get("Roaming")
        .expect("Get failed")
        .expect("Missing profile");
    assert_eq!(profile.name, "Roaming");
    assert!(coordinator
        .store()
        .list()
        .expect("List failed")
        .contains(&"Roaming".to_string()));
}

#[tokio::test]
async fn test_save_reports_nothing_to_capture_for_unconfigured_device() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let live = tmp.path().join("machine");

    let coordinator = coordinator_over(tmp.path().join("sync"), &live);
    let report = coordinator
        .save_all("Default", &[DeviceId::MosaicTools])
        .await
        .expect("Save batch failed");

    assert_eq!(
        report.outcome(DeviceId::MosaicTools),
        Some(&DeviceOutcome::NothingToCapture)
    );
    assert!(report.succeeded());
}

// =============================================================================
// Apply, backup, revert
// =============================================================================

#[tokio::test]
async fn test_apply_backs_up_live_state_then_imports() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let live = tmp.path().join("machine");
    seed_mic(&live, "<saved/>");

    let coordinator = coordinator_over(tmp.path().join("sync"), &live);
    coordinator
        .save_all("Default", &[DeviceId::SpeechMic])
        .await
        .expect("Save batch failed");

    // Live state drifts after the save.
    seed_mic(&live, "<drifted/>");

    let report = coordinator
        .apply_all("Default", &[DeviceId::SpeechMic])
        .await
        .expect("Apply batch failed");
    assert_eq!(
        report.outcome(DeviceId::SpeechMic),
        Some(&DeviceOutcome::Applied)
    );
    assert_eq!(read_mic(&live), "<saved/>");

    // The vault captured the pre-apply state, so a revert restores it.
    assert!(coordinator.has_backup(DeviceId::SpeechMic));
    let outcome = coordinator.revert_device(DeviceId::SpeechMic).await;
    assert_eq!(outcome, DeviceOutcome::Reverted);
    assert_eq!(read_mic(&live), "<drifted/>");
}

#[tokio::test]
async fn test_apply_missing_profile_errors() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let live = tmp.path().join("machine");

    let coordinator = coordinator_over(tmp.path().join("sync"), &live);
    let err = coordinator
        .apply_all("Nope", &[DeviceId::SpeechMic])
        .await
        .expect_err("Apply should fail");
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_apply_reports_no_data_for_empty_capture() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let live = tmp.path().join("machine");
    seed_tools(&live, r#"{ "theme": "light" }"#);

    let coordinator = coordinator_over(tmp.path().join("sync"), &live);
    let report = coordinator
        .apply_all("Default", &[DeviceId::MosaicTools])
        .await
        .expect("Apply batch failed");

    assert_eq!(
        report.outcome(DeviceId::MosaicTools),
        Some(&DeviceOutcome::NoData)
    );
    let unchanged = fs::read_to_string(live.join("tools").join("MosaicToolsSettings.json"))
        .expect("Missing settings");
    assert_eq!(unchanged, r#"{ "theme": "light" }"#);
}

#[tokio::test]
async fn test_backup_and_revert_single_device() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let live = tmp.path().join("machine");
    seed_mic(&live, "<original/>");

    let coordinator = coordinator_over(tmp.path().join("sync"), &live);
    assert!(!coordinator.has_backup(DeviceId::SpeechMic));

    let outcome = coordinator.backup_device(DeviceId::SpeechMic).await;
    assert_eq!(outcome, DeviceOutcome::Saved);
    assert!(coordinator.has_backup(DeviceId::SpeechMic));

    seed_mic(&live, "<broken/>");
    let outcome = coordinator.revert_device(DeviceId::SpeechMic).await;
    assert_eq!(outcome, DeviceOutcome::Reverted);
    assert_eq!(read_mic(&live), "<original/>");

    // The slot is not consumed; reverting again restores the same state.
    let outcome = coordinator.revert_device(DeviceId::SpeechMic).await;
    assert_eq!(outcome, DeviceOutcome::Reverted);
    assert_eq!(read_mic(&live), "<original/>");
}

#[tokio::test]
async fn test_revert_without_backup_fails() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let live = tmp.path().join("machine");

    let coordinator = coordinator_over(tmp.path().join("sync"), &live);
    let outcome = coordinator.revert_device(DeviceId::SpeechMic).await;
    assert!(!outcome.succeeded());
}

// =============================================================================
// Cross-machine flow
// =============================================================================

#[tokio::test]
async fn test_machine_specific_values_stay_on_their_machine() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let sync_base = tmp.path().join("sync");
    let live_a = tmp.path().join("machine_a");
    let live_b = tmp.path().join("machine_b");

    seed_hotkeys(
        &live_a,
        "[Settings]\nUser Name=jdoe\nPosX=10\nPosY=20\n\n[Bindings]\nF1=dictate\n",
    );
    seed_hotkeys(
        &live_b,
        "[Settings]\nUser Name=jdoe\nPosX=900\nPosY=450\n\n[Bindings]\nF1=old\n",
    );

    let machine_a = coordinator_over(sync_base.clone(), &live_a);
    machine_a
        .save_all("Shared", &[DeviceId::MosaicHotkeys])
        .await
        .expect("Save batch failed");

    // The shared capture must not carry machine A's window position.
    let captured_text = read_utf16(
        &machine_a
            .store()
            .profile_dir("Shared")
            .join("mosaichotkeys")
            .join("HotkeyConfig.ini"),
    );
    assert!(!captured_text.contains("PosX"));
    assert!(captured_text.contains("F1=dictate"));

    let machine_b = coordinator_over(sync_base, &live_b);
    let report = machine_b
        .apply_all("Shared", &[DeviceId::MosaicHotkeys])
        .await
        .expect("Apply batch failed");
    assert!(report.succeeded());

    let applied = read_utf16(&live_b.join("hotkeys").join("HotkeyConfig.ini"));
    assert!(applied.contains("F1=dictate"));
    assert!(applied.contains("PosX=900"));
    assert!(applied.contains("PosY=450"));
    assert!(!applied.contains("PosX=10"));
}
