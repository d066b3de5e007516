//! Device adapter tests
//!
//! Capture semantics that span helpers: SQLite checkpointing on the hub
//! capture and deck identity rebinding across machines.

use rigsync_core::device::{
    DeviceAdapter, LogitechAdapter, LogitechPaths, StreamDeckAdapter, StreamDeckPaths,
};
use rigsync_core::ExportStatus;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// =============================================================================
// Logitech
// =============================================================================

fn hub_adapter(tmp: &TempDir) -> LogitechAdapter {
    LogitechAdapter::new(LogitechPaths {
        settings_dir: tmp.path().join("LGHUB"),
        appdata_dir: tmp.path().join("lghub_appdata"),
        executable: tmp.path().join("lghub.exe"),
        process_names: Vec::new(),
    })
}

#[tokio::test]
async fn test_export_checkpoints_wal_into_base_database() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let settings = tmp.path().join("LGHUB");
    fs::create_dir_all(&settings).expect("Failed to create settings dir");

    // An open WAL connection keeps committed rows out of the base file.
    let live = Connection::open(settings.join("settings.db")).expect("Failed to open database");
    live.pragma_update(None, "journal_mode", "WAL")
        .expect("Failed to enable WAL");
    live.execute_batch(
        "CREATE TABLE prefs (key TEXT, value TEXT);
         INSERT INTO prefs VALUES ('theme', 'dark');",
    )
    .expect("Failed to seed database");
    assert!(settings.join("settings.db-wal").exists());

    let adapter = hub_adapter(&tmp);
    let capture_root = tmp.path().join("capture");
    let status = adapter.export(&capture_root).await.expect("Export failed");
    assert_eq!(status, ExportStatus::Captured);

    // The captured base file, read without any sibling WAL, must hold the row.
    let isolated = tmp.path().join("isolated.db");
    fs::copy(
        capture_root.join("logitech").join("LGHUB").join("settings.db"),
        &isolated,
    )
    .expect("Missing captured database");
    let check = Connection::open(&isolated).expect("Failed to open captured database");
    let count: i64 = check
        .query_row("SELECT COUNT(*) FROM prefs", [], |row| row.get(0))
        .expect("Query failed");
    assert_eq!(count, 1);
    drop(live);
}

#[tokio::test]
async fn test_export_captures_appdata_files() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir_all(tmp.path().join("LGHUB")).expect("Failed to create settings dir");
    fs::write(tmp.path().join("LGHUB").join("settings.db"), b"stub")
        .expect("Failed to write database");
    fs::create_dir_all(tmp.path().join("lghub_appdata")).expect("Failed to create appdata dir");
    fs::write(tmp.path().join("lghub_appdata").join("state.json"), "{}")
        .expect("Failed to write appdata file");

    let adapter = hub_adapter(&tmp);
    let capture_root = tmp.path().join("capture");
    adapter.export(&capture_root).await.expect("Export failed");

    assert!(capture_root
        .join("logitech")
        .join("lghub_appdata")
        .join("state.json")
        .is_file());
}

#[tokio::test]
async fn test_import_replaces_live_databases() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let capture_root = tmp.path().join("capture");
    let capture_db_dir = capture_root.join("logitech").join("LGHUB");
    fs::create_dir_all(&capture_db_dir).expect("Failed to create capture dir");
    fs::write(capture_db_dir.join("settings.db"), b"incoming").expect("Failed to write capture");

    let settings = tmp.path().join("LGHUB");
    fs::create_dir_all(&settings).expect("Failed to create settings dir");
    fs::write(settings.join("settings.db"), b"stale").expect("Failed to write stale database");
    fs::write(settings.join("settings.db-wal"), b"stale-wal").expect("Failed to write stale wal");

    let adapter = hub_adapter(&tmp);
    adapter.import(&capture_root).await.expect("Import failed");

    let replaced = fs::read(settings.join("settings.db")).expect("Missing database");
    assert_eq!(replaced, b"incoming");
    assert!(!settings.join("settings.db-wal").exists());
}

// =============================================================================
// Stream Deck
// =============================================================================

fn deck_adapter(app_data: &Path) -> StreamDeckAdapter {
    StreamDeckAdapter::new(StreamDeckPaths {
        app_data_dir: app_data.to_path_buf(),
        executable: app_data.join("StreamDeck.exe"),
        process_names: Vec::new(),
    })
}

fn write_deck_profile(app_data: &Path, profile: &str, model: &str, uuid: &str) {
    let dir = app_data.join("ProfilesV3").join(profile);
    fs::create_dir_all(&dir).expect("Failed to create profile dir");
    let manifest = json!({
        "Name": profile.trim_end_matches(".sdProfile"),
        "Device": { "Model": model, "UUID": uuid },
        "Version": "1.0"
    });
    fs::write(
        dir.join("manifest.json"),
        serde_json::to_string_pretty(&manifest).expect("Failed to serialize manifest"),
    )
    .expect("Failed to write manifest");
}

fn manifest_device(app_data: &Path, profile: &str) -> (String, String) {
    let raw = fs::read_to_string(
        app_data
            .join("ProfilesV3")
            .join(profile)
            .join("manifest.json"),
    )
    .expect("Missing manifest");
    let value: Value = serde_json::from_str(&raw).expect("Manifest is not JSON");
    (
        value["Device"]["Model"].as_str().unwrap_or("").to_string(),
        value["Device"]["UUID"].as_str().unwrap_or("").to_string(),
    )
}

#[tokio::test]
async fn test_import_rebinds_profiles_to_local_deck() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let deck_a = tmp.path().join("deck_a");
    let deck_b = tmp.path().join("deck_b");
    let capture_root = tmp.path().join("capture");

    // Machine A saves its profiles, bound to deck A.
    write_deck_profile(&deck_a, "main.sdProfile", "20GAA9901", "AAAA-1111");
    deck_adapter(&deck_a)
        .export(&capture_root)
        .await
        .expect("Export failed");

    // Machine B has its own deck; importing A's capture must bind to it.
    write_deck_profile(&deck_b, "scratch.sdProfile", "20GAT9902", "BBBB-2222");
    deck_adapter(&deck_b)
        .import(&capture_root)
        .await
        .expect("Import failed");

    let (model, uuid) = manifest_device(&deck_b, "main.sdProfile");
    assert_eq!(model, "20GAT9902");
    assert_eq!(uuid, "BBBB-2222");
}

#[tokio::test]
async fn test_import_uses_cached_identity_when_profiles_were_replaced() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let deck = tmp.path().join("deck");
    let capture_root = tmp.path().join("capture");

    // Export on this machine caches the local identity next to the config.
    write_deck_profile(&deck, "main.sdProfile", "20GAT9902", "BBBB-2222");
    let adapter = deck_adapter(&deck);
    adapter.export(&capture_root).await.expect("Export failed");
    assert!(deck.join("rigsync_device_cache.json").is_file());

    // Make the capture look like it came from another machine's deck.
    let captured_manifest = capture_root
        .join("streamdeck")
        .join("ProfilesV3")
        .join("main.sdProfile")
        .join("manifest.json");
    let mut manifest: Value =
        serde_json::from_str(&fs::read_to_string(&captured_manifest).expect("Missing manifest"))
            .expect("Manifest is not JSON");
    manifest["Device"] = json!({ "Model": "20GAA9901", "UUID": "AAAA-1111" });
    fs::write(&captured_manifest, manifest.to_string()).expect("Failed to rewrite manifest");

    // Live profiles vanish (fresh reinstall); the cache still knows the deck.
    fs::remove_dir_all(deck.join("ProfilesV3")).expect("Failed to clear profiles");

    adapter.import(&capture_root).await.expect("Import failed");
    let (model, uuid) = manifest_device(&deck, "main.sdProfile");
    assert_eq!(model, "20GAT9902");
    assert_eq!(uuid, "BBBB-2222");
}

#[tokio::test]
async fn test_export_excludes_non_essential_folders() {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let deck = tmp.path().join("deck");
    write_deck_profile(&deck, "main.sdProfile", "20GAA9901", "AAAA-1111");
    fs::create_dir_all(deck.join("Plugins").join("com.example.counter"))
        .expect("Failed to create plugin dir");
    fs::create_dir_all(deck.join("logs")).expect("Failed to create log dir");
    fs::write(deck.join("logs").join("sd.log"), "noise").expect("Failed to write log");

    let capture_root = tmp.path().join("capture");
    deck_adapter(&deck)
        .export(&capture_root)
        .await
        .expect("Export failed");

    let capture = capture_root.join("streamdeck");
    assert!(capture.join("ProfilesV3").is_dir());
    assert!(!capture.join("Plugins").exists());
    assert!(!capture.join("logs").exists());
}
