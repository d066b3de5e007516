//! Philips SpeechMike capture adapter.
//!
//! Device Control Center stores button mappings and application control
//! profiles as XML files in its local application-data directory. Captures
//! are straight file copies; the control center tolerates its files being
//! read and replaced while it runs, so no process control is involved.

use super::{AdapterError, DeviceAdapter, DeviceId, ExportStatus};
use crate::util;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Filesystem locations of a Device Control Center installation.
#[derive(Debug, Clone)]
pub struct SpeechMicPaths {
    /// Directory holding the XML configuration files.
    pub config_dir: PathBuf,
    /// Installed executable; its presence is the install check.
    pub executable: PathBuf,
}

impl Default for SpeechMicPaths {
    fn default() -> Self {
        let local = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            config_dir: local.join("Philips Device Control Center"),
            executable: PathBuf::from(
                r"C:\Program Files (x86)\Philips Speech\Device Control Center\PDCC.exe",
            ),
        }
    }
}

pub struct SpeechMicAdapter {
    paths: SpeechMicPaths,
}

impl SpeechMicAdapter {
    #[must_use]
    pub fn new(paths: SpeechMicPaths) -> Self {
        Self { paths }
    }
}

fn is_xml(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".xml")
}

#[async_trait]
impl DeviceAdapter for SpeechMicAdapter {
    fn id(&self) -> DeviceId {
        DeviceId::SpeechMic
    }

    fn display_name(&self) -> &'static str {
        "Philips SpeechMic"
    }

    fn is_installed(&self) -> bool {
        self.paths.executable.exists()
    }

    async fn export(&self, capture_root: &Path) -> Result<ExportStatus, AdapterError> {
        let capture_dir = capture_root.join(self.capture_dir_name());
        tokio::fs::create_dir_all(&capture_dir)
            .await
            .map_err(|e| AdapterError::io(&capture_dir, e))?;

        if !self.paths.config_dir.is_dir() {
            return Ok(ExportStatus::NothingToCapture);
        }

        let mut copied = 0;
        for file in util::files_matching(&self.paths.config_dir, is_xml) {
            let Some(name) = file.file_name() else {
                continue;
            };
            let dest = capture_dir.join(name);
            tokio::fs::copy(&file, &dest)
                .await
                .map_err(|e| AdapterError::io(&dest, e))?;
            copied += 1;
        }

        if copied > 0 {
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

        let config_dir = &self.paths.config_dir;
        tokio::fs::create_dir_all(config_dir)
            .await
            .map_err(|e| AdapterError::io(config_dir, e))?;

        for file in util::files_matching(&capture_dir, is_xml) {
            let Some(name) = file.file_name() else {
                continue;
            };
            let dest = config_dir.join(name);
            tokio::fs::copy(&file, &dest)
                .await
                .map_err(|e| AdapterError::io(&dest, e))?;
        }
        Ok(())
    }

    fn has_config_data(&self, capture_root: &Path) -> bool {
        let capture_dir = capture_root.join(self.capture_dir_name());
        !util::files_matching(&capture_dir, is_xml).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn adapter_over(tmp: &TempDir) -> SpeechMicAdapter {
        SpeechMicAdapter::new(SpeechMicPaths {
            config_dir: tmp.path().join("pdcc"),
            executable: tmp.path().join("PDCC.exe"),
        })
    }

    #[tokio::test]
    async fn test_export_copies_xml_files_only() {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let adapter = adapter_over(&tmp);
        fs::create_dir_all(tmp.path().join("pdcc")).expect("Failed to create config dir");
        fs::write(
            tmp.path().join("pdcc/AppControlConfig.Epic.xml"),
            "<config/>",
        )
        .expect("Failed to write config");
        fs::write(tmp.path().join("pdcc/readme.txt"), "not config").expect("Failed to write file");

        let root = tmp.path().join("capture");
        let status = adapter.export(&root).await.expect("Export failed");
        assert_eq!(status, ExportStatus::Captured);
        assert!(root.join("speechmic/AppControlConfig.Epic.xml").exists());
        assert!(!root.join("speechmic/readme.txt").exists());
        assert!(adapter.has_config_data(&root));
    }

    #[tokio::test]
    async fn test_export_without_config_dir_captures_nothing() {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let adapter = adapter_over(&tmp);

        let root = tmp.path().join("capture");
        let status = adapter.export(&root).await.expect("Export failed");
        assert_eq!(status, ExportStatus::NothingToCapture);
        assert!(!adapter.has_config_data(&root));
    }

    #[tokio::test]
    async fn test_import_requires_capture_data() {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let adapter = adapter_over(&tmp);

        let root = tmp.path().join("capture");
        let err = adapter.import(&root).await.expect_err("Import should fail");
        assert!(matches!(err, AdapterError::NoCaptureData { .. }));
    }

    #[tokio::test]
    async fn test_import_restores_into_config_dir() {
        let tmp = TempDir::new().expect("Failed to create temp dir");
        let adapter = adapter_over(&tmp);
        let root = tmp.path().join("capture");
        fs::create_dir_all(root.join("speechmic")).expect("Failed to create capture dir");
        fs::write(root.join("speechmic/Settings.xml"), "<s/>").expect("Failed to write capture");

        adapter.import(&root).await.expect("Import failed");
        assert_eq!(
            fs::read_to_string(tmp.path().join("pdcc/Settings.xml")).expect("Missing restored file"),
            "<s/>"
        );
    }
}
