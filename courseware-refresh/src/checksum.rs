//! Deterministic stub enumeration and the per-exercise content digest.
//!
//! The digest is SHA-256 over, in enumeration order, each entry's relative
//! path followed by the bytes of the file (directories contribute their path
//! only). Archive contents use the same enumeration.

use std::fs::File;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{io_err, walk_err, RefreshError};

/// One path under an exercise's stub directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubEntry {
    /// `/`-separated path relative to the stub directory.
    pub rel: String,
    /// Absolute path on disk.
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Every file and directory below `stub_dir`, excluding `stub_dir` itself,
/// sorted by relative path string.
pub fn stub_entries(stub_dir: &Path) -> Result<Vec<StubEntry>, RefreshError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(stub_dir).min_depth(1) {
        let entry = entry.map_err(|e| walk_err(stub_dir, e))?;
        let file_type = entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            tracing::debug!("ignoring special entry {}", entry.path().display());
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(stub_dir) else {
            continue;
        };
        entries.push(StubEntry {
            rel: rel_string(rel),
            path: entry.path().to_path_buf(),
            is_dir: file_type.is_dir(),
        });
    }
    entries.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(entries)
}

fn rel_string(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hex SHA-256 digest of `entries` (as returned by [`stub_entries`]).
pub fn checksum(entries: &[StubEntry]) -> Result<String, RefreshError> {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.rel.as_bytes());
        if !entry.is_dir {
            let mut file = File::open(&entry.path).map_err(|e| io_err(&entry.path, e))?;
            std::io::copy(&mut file, &mut hasher).map_err(|e| io_err(&entry.path, e))?;
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

/// [`stub_entries`] followed by [`checksum`].
pub fn stub_checksum(stub_dir: &Path) -> Result<String, RefreshError> {
    checksum(&stub_entries(stub_dir)?)
}
