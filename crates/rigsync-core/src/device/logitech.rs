//! Logitech G Hub capture adapter.
//!
//! G Hub keeps its settings in SQLite databases under the local LGHUB
//! directory, plus a handful of small JSON files under the roaming lghub
//! directory. A capture takes the database files (checkpointed first, so
//! the WAL is folded into the base file and the copy is complete on its
//! own) and the roaming files. G Hub runs as a family of four processes
//! that all have to be down before the databases can be touched.

use super::{run_blocking, AdapterError, DeviceAdapter, DeviceId, ExportStatus};
use crate::process::ProcessLifecycleGuard;
use crate::util;
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File suffixes that carry G Hub state.
const DATABASE_SUFFIXES: [&str; 3] = [".db", ".db-shm", ".db-wal"];
/// Capture subfolder for the databases.
const DB_SUBDIR: &str = "LGHUB";
/// Capture subfolder for roaming application data.
const APPDATA_SUBDIR: &str = "lghub_appdata";

/// Filesystem and process locations of a G Hub installation.
#[derive(Debug, Clone)]
pub struct LogitechPaths {
    /// Directory holding the SQLite settings databases.
    pub settings_dir: PathBuf,
    /// Roaming application-data directory with auxiliary JSON files.
    pub appdata_dir: PathBuf,
    /// Installed executable, used for relaunching.
    pub executable: PathBuf,
    /// Processes that must be down before the databases are touched.
    pub process_names: Vec<String>,
}

impl Default for LogitechPaths {
    fn default() -> Self {
        let local = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        let roaming = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            settings_dir: local.join("LGHUB"),
            appdata_dir: roaming.join("lghub"),
            executable: PathBuf::from(r"C:\Program Files\LGHUB\lghub.exe"),
            process_names: vec![
                "lghub".to_string(),
                "lghub_agent".to_string(),
                "lghub_updater".to_string(),
                "lghub_system_tray".to_string(),
            ],
        }
    }
}

pub struct LogitechAdapter {
    paths: LogitechPaths,
    guard: ProcessLifecycleGuard,
}

impl LogitechAdapter {
    #[must_use]
    pub fn new(paths: LogitechPaths) -> Self {
        let guard = ProcessLifecycleGuard::new(paths.process_names.clone());
        Self { paths, guard }
    }
}

fn is_database_file(name: &str) -> bool {
    DATABASE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Fold WAL contents into each base database file.
///
/// Failures are logged, not fatal: the copy then simply includes whatever
/// `-wal`/`-shm` files remain next to the base.
fn checkpoint_databases(dir: &Path) {
    for db in util::files_matching(dir, |name| name.ends_with(".db")) {
        match Connection::open_with_flags(&db, OpenFlags::SQLITE_OPEN_READ_WRITE) {
            Ok(conn) => {
                let busy: Result<i64, rusqlite::Error> =
                    conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| row.get(0));
                match busy {
                    Ok(0) => debug!(db = %db.display(), "WAL checkpoint complete"),
                    Ok(_) => warn!(db = %db.display(), "WAL checkpoint blocked; copying current state"),
                    Err(e) => warn!(db = %db.display(), error = %e, "WAL checkpoint failed"),
                }
            }
            Err(e) => {
                warn!(db = %db.display(), error = %e, "Could not open database for checkpoint");
            }
        }
    }
}

#[async_trait]
impl DeviceAdapter for LogitechAdapter {
    fn id(&self) -> DeviceId {
        DeviceId::Logitech
    }

    fn display_name(&self) -> &'static str {
        "Logitech G Hub"
    }

    fn is_installed(&self) -> bool {
        self.paths.executable.exists() || self.paths.settings_dir.is_dir()
    }

    async fn export(&self, capture_root: &Path) -> Result<ExportStatus, AdapterError> {
        if !self.paths.settings_dir.is_dir() {
            return Ok(ExportStatus::NothingToCapture);
        }

        let was_running = self.guard.stop().await;

        let settings_dir = self.paths.settings_dir.clone();
        let appdata_dir = self.paths.appdata_dir.clone();
        let capture_dir = capture_root.join(self.capture_dir_name());

        let copied_databases = run_blocking(move || {
            util::clear_dir(&capture_dir).map_err(|e| AdapterError::io(&capture_dir, e))?;

            checkpoint_databases(&settings_dir);
            let db_capture = capture_dir.join(DB_SUBDIR);
            let copied = util::copy_files_flat(&settings_dir, &db_capture, is_database_file)
                .map_err(|e| AdapterError::io(&db_capture, e))?;

            if appdata_dir.is_dir() {
                let appdata_capture = capture_dir.join(APPDATA_SUBDIR);
                util::copy_files_flat(&appdata_dir, &appdata_capture, |_| true)
                    .map_err(|e| AdapterError::io(&appdata_capture, e))?;
            }

            Ok(copied)
        })
        .await?;

        if was_running {
            self.guard.launch(&self.paths.executable);
        }

        if copied_databases > 0 {
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

        let settings_dir = self.paths.settings_dir.clone();
        let appdata_dir = self.paths.appdata_dir.clone();

        run_blocking(move || {
            let db_capture = capture_dir.join(DB_SUBDIR);
            if db_capture.is_dir() {
                fs::create_dir_all(&settings_dir)
                    .map_err(|e| AdapterError::io(&settings_dir, e))?;

                // Replace only the database files; G Hub's other state stays.
                for stale in util::files_matching(&settings_dir, is_database_file) {
                    if let Err(e) = fs::remove_file(&stale) {
                        warn!(path = %stale.display(), error = %e, "Could not remove stale database file");
                    }
                }
                util::copy_files_flat(&db_capture, &settings_dir, |_| true)
                    .map_err(|e| AdapterError::io(&settings_dir, e))?;
            }

            let appdata_capture = capture_dir.join(APPDATA_SUBDIR);
            if appdata_capture.is_dir() {
                util::copy_files_flat(&appdata_capture, &appdata_dir, |_| true)
                    .map_err(|e| AdapterError::io(&appdata_dir, e))?;
            }

            Ok(())
        })
        .await?;

        // Relaunch regardless of prior state; an installed G Hub should come
        // back up reading the imported databases.
        self.guard.launch(&self.paths.executable);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_suffix_matching() {
        assert!(is_database_file("settings.db"));
        assert!(is_database_file("settings.db-shm"));
        assert!(is_database_file("settings.db-wal"));
        assert!(!is_database_file("settings.json"));
        assert!(!is_database_file("settings.db.bak"));
    }
}
