//! Versioned cache layout.
//!
//! ```text
//! <cache_root>/
//!   <course>/
//!     <cache_version>/
//!       clone/<exercise path>/…
//!       solutions/<exercise path>/…
//!       stubs/<exercise path>/…
//!       archives/<exercise name>.tar.gz
//! ```
//!
//! Everything here is a pure function of (cache root, course, version).

use std::path::{Path, PathBuf};

use courseware_core::{CourseName, Exercise};

use crate::error::{io_err, RefreshError};

pub const CLONE_DIR: &str = "clone";
pub const SOLUTIONS_DIR: &str = "solutions";
pub const STUBS_DIR: &str = "stubs";
pub const ARCHIVES_DIR: &str = "archives";
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// `<cache_root>/<course>/`: parent of every version of one course.
pub fn course_cache_dir(cache_root: &Path, course: &CourseName) -> PathBuf {
    cache_root.join(&course.0)
}

/// Paths of one cache version of one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub cache_root: PathBuf,
    pub version: u64,
    pub version_root: PathBuf,
    pub clone_root: PathBuf,
    pub solution_root: PathBuf,
    pub stub_root: PathBuf,
    pub archive_root: PathBuf,
}

impl CachePaths {
    pub fn new(cache_root: &Path, course: &CourseName, version: u64) -> Self {
        let version_root = course_cache_dir(cache_root, course).join(version.to_string());
        Self {
            cache_root: cache_root.to_path_buf(),
            version,
            clone_root: version_root.join(CLONE_DIR),
            solution_root: version_root.join(SOLUTIONS_DIR),
            stub_root: version_root.join(STUBS_DIR),
            archive_root: version_root.join(ARCHIVES_DIR),
            version_root,
        }
    }

    pub fn exercise_clone(&self, exercise: &Exercise) -> PathBuf {
        self.clone_root.join(&exercise.path)
    }

    pub fn exercise_solution(&self, exercise: &Exercise) -> PathBuf {
        self.solution_root.join(&exercise.path)
    }

    pub fn exercise_stub(&self, exercise: &Exercise) -> PathBuf {
        self.stub_root.join(&exercise.path)
    }

    pub fn exercise_archive(&self, exercise: &Exercise) -> PathBuf {
        self.archive_root
            .join(format!("{}.{ARCHIVE_EXTENSION}", exercise.name.0))
    }

    /// Create the empty `{clone,solutions,stubs,archives}` skeleton.
    ///
    /// The clone directory itself is left for the source client to create.
    pub fn create_skeleton(&self) -> Result<(), RefreshError> {
        for dir in [&self.version_root, &self.solution_root, &self.stub_root, &self.archive_root] {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        Ok(())
    }

    /// Delete the whole version tree. Missing trees are not an error.
    pub fn remove(&self) -> Result<(), RefreshError> {
        remove_tree(&self.version_root)
    }
}

/// `remove_dir_all` that treats an absent directory as success.
pub(crate) fn remove_tree(path: &Path) -> Result<(), RefreshError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(path, e)),
    }
}

/// Cache version numbers present on disk for a course, ascending.
///
/// Non-numeric entries are ignored.
pub fn versions_on_disk(cache_root: &Path, course: &CourseName) -> Result<Vec<u64>, RefreshError> {
    let dir = course_cache_dir(cache_root, course);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(io_err(&dir, e)),
    };
    let mut versions: Vec<u64> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().and_then(|s| s.parse().ok()))
        .collect();
    versions.sort_unstable();
    Ok(versions)
}
