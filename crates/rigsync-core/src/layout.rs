//! On-disk layout of a sync root.
//!
//! Everything the engine persists lives under one base directory, typically
//! a shared or mirrored drive:
//!
//! ```text
//! <base>/
//!   profiles/<name>/     profile.json plus per-device capture folders
//!   backup/              one capture slot per device, plus vault.json
//!   settings.json        application preferences
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Well-known paths under the shared sync directory.
#[derive(Debug, Clone)]
pub struct SyncRoot {
    base: PathBuf,
}

impl SyncRoot {
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Platform default: `DeviceProfiles` under the user's documents folder.
    #[must_use]
    pub fn discover() -> Self {
        let documents = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(documents.join("DeviceProfiles"))
    }

    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    #[must_use]
    pub fn profiles_dir(&self) -> PathBuf {
        self.base.join("profiles")
    }

    #[must_use]
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(name)
    }

    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.base.join("backup")
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.base.join("settings.json")
    }

    /// Create the directory skeleton.
    ///
    /// # Errors
    /// Returns an error if a directory cannot be created.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base)?;
        fs::create_dir_all(self.profiles_dir())?;
        fs::create_dir_all(self.backup_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_compose_under_base() {
        let root = SyncRoot::new("/srv/sync");
        assert_eq!(root.profiles_dir(), PathBuf::from("/srv/sync/profiles"));
        assert_eq!(
            root.profile_dir("Default"),
            PathBuf::from("/srv/sync/profiles/Default")
        );
        assert_eq!(root.backup_dir(), PathBuf::from("/srv/sync/backup"));
        assert_eq!(root.settings_path(), PathBuf::from("/srv/sync/settings.json"));
    }

    #[test]
    fn test_ensure_creates_skeleton() {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let root = SyncRoot::new(tmp.path().join("sync"));
        root.ensure().expect("Failed to ensure layout");
        assert!(root.profiles_dir().is_dir());
        assert!(root.backup_dir().is_dir());
    }
}
