//! Device capture adapters.
//!
//! One adapter per supported peripheral or desk utility. An adapter knows
//! where the application keeps its live configuration, which processes own
//! those files, and which values are machine-specific. It moves state in two
//! directions: `export` copies live configuration into a capture root (a
//! profile's device folder or the backup vault), `import` pushes a capture
//! back over the live state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub mod logitech;
pub mod mosaic_hotkeys;
pub mod mosaic_tools;
pub mod speechmic;
pub mod streamdeck;

pub use logitech::{LogitechAdapter, LogitechPaths};
pub use mosaic_hotkeys::{MosaicHotkeysAdapter, MosaicHotkeysPaths};
pub use mosaic_tools::{MosaicToolsAdapter, MosaicToolsPaths};
pub use speechmic::{SpeechMicAdapter, SpeechMicPaths};
pub use streamdeck::{StreamDeckAdapter, StreamDeckPaths};

/// Identifier of a supported device integration.
///
/// The variant names double as JSON keys in profile metadata, and their
/// lowercase forms as capture folder names, so both are part of the on-disk
/// format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceId {
    Logitech,
    StreamDeck,
    SpeechMic,
    MosaicHotkeys,
    MosaicTools,
}

impl DeviceId {
    /// Every supported device, in registry order.
    pub const ALL: [Self; 5] = [
        Self::Logitech,
        Self::StreamDeck,
        Self::SpeechMic,
        Self::MosaicHotkeys,
        Self::MosaicTools,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logitech => "Logitech",
            Self::StreamDeck => "StreamDeck",
            Self::SpeechMic => "SpeechMic",
            Self::MosaicHotkeys => "MosaicHotkeys",
            Self::MosaicTools => "MosaicTools",
        }
    }

    /// Folder name for this device inside a capture root.
    #[must_use]
    pub fn capture_dir(self) -> &'static str {
        match self {
            Self::Logitech => "logitech",
            Self::StreamDeck => "streamdeck",
            Self::SpeechMic => "speechmic",
            Self::MosaicHotkeys => "mosaichotkeys",
            Self::MosaicTools => "mosaictools",
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceId {
    type Err = UnknownDeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "logitech" | "ghub" => Ok(Self::Logitech),
            "streamdeck" | "stream-deck" => Ok(Self::StreamDeck),
            "speechmic" | "speech-mic" => Ok(Self::SpeechMic),
            "mosaichotkeys" | "mosaic-hotkeys" | "hotkeys" => Ok(Self::MosaicHotkeys),
            "mosaictools" | "mosaic-tools" | "tools" => Ok(Self::MosaicTools),
            _ => Err(UnknownDeviceError(s.to_string())),
        }
    }
}

/// A device name that matches no known integration.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown device '{0}' (expected one of: Logitech, StreamDeck, SpeechMic, MosaicHotkeys, MosaicTools)")]
pub struct UnknownDeviceError(String);

/// What an export found to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    /// Live configuration existed and at least one file was captured.
    Captured,
    /// The application is absent or holds nothing; no files were written.
    NothingToCapture,
}

/// Errors surfaced by a capture adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Import was asked to run from a capture root holding no data for this
    /// device.
    #[error("no captured data for {device} in {}", .path.display())]
    NoCaptureData { device: DeviceId, path: PathBuf },

    #[error("I/O failure at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("background copy task failed: {0}")]
    Task(String),
}

impl AdapterError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Run blocking filesystem work off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, AdapterError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AdapterError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AdapterError::Task(e.to_string()))?
}

/// A device integration.
///
/// `capture_root` is a directory holding one folder per device; an adapter
/// owns the folder named by [`DeviceAdapter::capture_dir_name`] inside it
/// and must never touch its siblings.
#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    fn id(&self) -> DeviceId;

    /// Human-readable name for logs and status output.
    fn display_name(&self) -> &'static str;

    /// Folder this adapter owns inside a capture root.
    fn capture_dir_name(&self) -> &'static str {
        self.id().capture_dir()
    }

    /// Whether the native application appears to be present on this machine.
    fn is_installed(&self) -> bool;

    /// Copy live configuration into `capture_root`, stripping
    /// machine-specific values.
    ///
    /// # Errors
    /// Returns an error only on unrecoverable I/O failure. An absent
    /// application or empty live state is [`ExportStatus::NothingToCapture`],
    /// not an error.
    async fn export(&self, capture_root: &Path) -> Result<ExportStatus, AdapterError>;

    /// Push captured configuration over the live state, merging this
    /// machine's values back in.
    ///
    /// # Errors
    /// Returns [`AdapterError::NoCaptureData`] when the capture root holds
    /// nothing for this device; I/O errors otherwise.
    async fn import(&self, capture_root: &Path) -> Result<(), AdapterError>;

    /// Whether `capture_root` holds data this adapter could import.
    fn has_config_data(&self, capture_root: &Path) -> bool {
        crate::util::dir_has_entries(&capture_root.join(self.capture_dir_name()))
    }
}

/// All built-in adapters with platform-default paths, in registry order.
#[must_use]
pub fn builtin_adapters() -> Vec<Arc<dyn DeviceAdapter>> {
    vec![
        Arc::new(LogitechAdapter::new(LogitechPaths::default())),
        Arc::new(StreamDeckAdapter::new(StreamDeckPaths::default())),
        Arc::new(SpeechMicAdapter::new(SpeechMicPaths::default())),
        Arc::new(MosaicHotkeysAdapter::new(MosaicHotkeysPaths::default())),
        Arc::new(MosaicToolsAdapter::new(MosaicToolsPaths::default())),
    ]
}
