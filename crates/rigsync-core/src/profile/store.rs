//! Profile storage operations (CRUD)
//!
//! Each profile is a directory under `<base>/profiles/` holding a
//! `profile.json` metadata file next to the per-device capture folders. The
//! directory name is the profile's identity.

use crate::layout::SyncRoot;
use crate::profile::Profile;
use crate::util;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Created automatically when the store holds no profiles at all.
pub const DEFAULT_PROFILE: &str = "Default";

const METADATA_FILE: &str = "profile.json";

const MAX_NAME_LEN: usize = 128;

/// Capture folder names; a profile with one of these names would be
/// indistinguishable from a device folder in ad-hoc directory listings.
const RESERVED_NAMES: &[&str] = &[
    "logitech",
    "streamdeck",
    "speechmic",
    "mosaichotkeys",
    "mosaictools",
    "backup",
    "profiles",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("profile '{0}' already exists")]
    AlreadyExists(String),

    #[error("profile '{0}' not found")]
    NotFound(String),

    #[error("invalid profile name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Directory-backed profile store.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: SyncRoot,
}

impl ProfileStore {
    /// Open the store, creating the directory skeleton and, when the store is
    /// completely empty, the default profile.
    ///
    /// # Errors
    /// Returns an error if the layout cannot be created or the default
    /// profile cannot be written.
    pub fn open(root: SyncRoot) -> Result<Self, StoreError> {
        root.ensure().map_err(|e| StoreError::io(root.base(), e))?;
        let store = Self { root };

        if store.list()?.is_empty() {
            info!(profile = DEFAULT_PROFILE, "No profiles yet, creating the default");
            store.create(DEFAULT_PROFILE)?;
        }
        Ok(store)
    }

    #[must_use]
    pub fn root(&self) -> &SyncRoot {
        &self.root
    }

    /// Directory holding a profile's metadata and captures.
    #[must_use]
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.root.profile_dir(name)
    }

    /// Names of all stored profiles, sorted.
    ///
    /// # Errors
    /// Returns an error if the profiles directory cannot be read.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.root.profiles_dir();
        let entries = fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Load a profile's metadata, or `None` when the profile or its metadata
    /// file is absent.
    ///
    /// # Errors
    /// Returns an error if the metadata exists but cannot be read or parsed.
    pub fn get(&self, name: &str) -> Result<Option<Profile>, StoreError> {
        if validate_name(name).is_err() {
            return Ok(None);
        }
        let path = self.profile_dir(name).join(METADATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let profile = serde_json::from_str(&json).map_err(|e| StoreError::Parse {
            path,
            source: e,
        })?;
        Ok(Some(profile))
    }

    /// Create a new profile with default metadata.
    ///
    /// # Errors
    /// Returns an error if the name is invalid, the profile already exists,
    /// or the metadata cannot be written.
    pub fn create(&self, name: &str) -> Result<Profile, StoreError> {
        ensure_valid_name(name)?;

        let dir = self.profile_dir(name);
        if dir.exists() {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let mut profile = Profile::new(name);
        self.save(&mut profile)?;
        Ok(profile)
    }

    /// Delete a profile and every capture under it.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the profile does not exist, or an
    /// I/O error if removal fails.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        ensure_valid_name(name)?;

        let dir = self.profile_dir(name);
        if !dir.is_dir() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        fs::remove_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))
    }

    /// Rename a profile, moving its directory and rewriting the metadata name.
    ///
    /// # Errors
    /// Returns an error if the new name is invalid or taken, the old profile
    /// does not exist, or the move fails.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), StoreError> {
        ensure_valid_name(old)?;
        ensure_valid_name(new)?;

        let old_dir = self.profile_dir(old);
        let new_dir = self.profile_dir(new);
        if !old_dir.is_dir() {
            return Err(StoreError::NotFound(old.to_string()));
        }
        if new_dir.exists() {
            return Err(StoreError::AlreadyExists(new.to_string()));
        }
        fs::rename(&old_dir, &new_dir).map_err(|e| StoreError::io(&old_dir, e))?;

        match self.get(new)? {
            Some(mut profile) => {
                profile.name = new.to_string();
                self.save(&mut profile)?;
            }
            None => {
                warn!(profile = new, "Renamed profile has no metadata file");
            }
        }
        Ok(())
    }

    /// Write a profile's metadata, refreshing its modification stamp.
    ///
    /// # Errors
    /// Returns an error if the name is invalid or the metadata cannot be
    /// written.
    pub fn save(&self, profile: &mut Profile) -> Result<(), StoreError> {
        ensure_valid_name(&profile.name)?;
        let dir = self.profile_dir(&profile.name);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        profile.touch();
        let path = dir.join(METADATA_FILE);
        util::write_json_atomic(&path, profile).map_err(|e| StoreError::io(&path, e))
    }
}

pub(crate) fn ensure_valid_name(name: &str) -> Result<(), StoreError> {
    validate_name(name).map_err(|reason| StoreError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name.len() > MAX_NAME_LEN {
        return Err("name is too long");
    }
    if name.contains('/') || name.contains('\\') {
        return Err("name contains a path separator");
    }
    if name.contains("..") {
        return Err("name contains a parent-directory sequence");
    }
    if name.starts_with('.') {
        return Err("name starts with a dot");
    }
    if name.contains('\0') {
        return Err("name contains a null byte");
    }
    if RESERVED_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
    {
        return Err("name is reserved");
    }
    Ok(())
}
