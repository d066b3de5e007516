//! Filesystem and text-encoding helpers shared by the capture adapters.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Maximum directory depth for recursive copies.
const MAX_DEPTH: usize = 32;

/// Recursively copy a directory tree, returning the number of files copied.
///
/// Symlinks are skipped to prevent loops and directory escape. A file that
/// cannot be copied (locked, vanished mid-scan) is logged and skipped so a
/// single bad entry does not abort the whole capture.
///
/// # Errors
/// Returns an error if a directory cannot be created or read, or if the tree
/// is deeper than the safety limit.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<usize> {
    let mut copied = 0;
    copy_dir_recursive_impl(src, dst, 0, &mut copied)?;
    Ok(copied)
}

fn copy_dir_recursive_impl(
    src: &Path,
    dst: &Path,
    depth: usize,
    copied: &mut usize,
) -> io::Result<()> {
    if depth > MAX_DEPTH {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("directory depth exceeds maximum of {MAX_DEPTH}: {}", src.display()),
        ));
    }

    if !src.exists() {
        return Ok(());
    }

    // Skip symlinks to prevent loops and directory escape
    if fs::symlink_metadata(src)?.file_type().is_symlink() {
        return Ok(());
    }

    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        let metadata = fs::symlink_metadata(&src_path)?;
        if metadata.file_type().is_symlink() {
            continue;
        }

        if metadata.is_dir() {
            copy_dir_recursive_impl(&src_path, &dst_path, depth + 1, copied)?;
        } else {
            match fs::copy(&src_path, &dst_path) {
                Ok(_) => *copied += 1,
                Err(e) => {
                    warn!(path = %src_path.display(), error = %e, "Skipping unreadable file");
                }
            }
        }
    }

    Ok(())
}

/// Copy the immediate files of `src` into `dst` (no recursion), keeping only
/// names accepted by `keep`. Returns the number of files copied.
///
/// Per-file failures are logged and skipped, matching [`copy_dir_recursive`].
///
/// # Errors
/// Returns an error if `src` cannot be read or `dst` cannot be created.
pub fn copy_files_flat(
    src: &Path,
    dst: &Path,
    keep: impl Fn(&str) -> bool,
) -> io::Result<usize> {
    if !src.is_dir() {
        return Ok(0);
    }
    fs::create_dir_all(dst)?;

    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let metadata = fs::symlink_metadata(&src_path)?;
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name();
        if !keep(&name.to_string_lossy()) {
            continue;
        }
        match fs::copy(&src_path, dst.join(&name)) {
            Ok(_) => copied += 1,
            Err(e) => {
                warn!(path = %src_path.display(), error = %e, "Skipping unreadable file");
            }
        }
    }
    Ok(copied)
}

/// Remove a directory and recreate it empty.
///
/// # Errors
/// Returns an error if removal or recreation fails.
pub fn clear_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

/// Whether a directory exists and contains at least one entry.
#[must_use]
pub fn dir_has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// List the immediate files of a directory whose names satisfy `keep`.
///
/// Missing directories yield an empty list.
#[must_use]
pub fn files_matching(dir: &Path, keep: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .map(|n| keep(&n.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Read a text file, honoring a UTF-16 (LE or BE) or UTF-8 byte-order mark.
///
/// Windows utilities write their INI state as UTF-16 LE with a BOM; files
/// without a BOM are treated as UTF-8 with lossy conversion.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_text_auto(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(decode_text_auto(&bytes))
}

fn decode_text_auto(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
        String::from_utf8_lossy(body).into_owned()
    }
}

/// Write a text file as UTF-16 LE with a byte-order mark.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_text_utf16_le(path: &Path, text: &str) -> io::Result<()> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    fs::write(path, bytes)
}

/// Count the files under `dir` and compute a SHA-256 digest of their relative
/// paths and contents, in sorted order.
///
/// Unreadable files are skipped; the digest covers what a restore would see.
#[must_use]
pub fn digest_dir(dir: &Path) -> (usize, String) {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();

    let mut hasher = Sha256::new();
    let mut count = 0;
    for file in files {
        let Ok(content) = fs::read(&file) else {
            continue;
        };
        if let Ok(relative) = file.strip_prefix(dir) {
            hasher.update(relative.to_string_lossy().as_bytes());
        }
        hasher.update(&content);
        count += 1;
    }
    (count, hex::encode(hasher.finalize()))
}

/// Serialize `value` as pretty JSON and write it to `path` atomically via a
/// temp file in the same directory.
///
/// # Errors
/// Returns an error if serialization or the write/rename fails.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
