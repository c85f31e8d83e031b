//! Exercise layout detection.
//!
//! `detect_layout(path)` inspects indicator files in a directory and returns
//! the build layout of the exercise rooted there, if any. Checks are ordered by
//! specificity: build-tool manifests take priority over the bare
//! `src/` + `test/` convention.

use std::fs;
use std::path::Path;

use crate::{io_err, ExerciseDetector, ScanError};

/// Build layout of a detected exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseLayout {
    /// `pom.xml` with a `src/` tree.
    Maven,
    /// `build.gradle` / `build.gradle.kts` with a `src/` tree.
    Gradle,
    /// `build.xml` with `src/` and `test/`.
    Ant,
    /// `src/` and `test/` next to a `tmc/` helper package or `setup.py`.
    Python,
    /// `Makefile` with `src/` and `test/`.
    Make,
    /// Plain `src/` and `test/` directories.
    Plain,
}

/// Detect the layout of the directory at `path`.
///
/// Returns `Ok(None)` for directories that are not exercise roots.
pub fn detect_layout(path: &Path) -> Result<Option<ExerciseLayout>, ScanError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    if !meta.is_dir() {
        return Ok(None);
    }

    let has_src = path.join("src").is_dir();
    let has_test = path.join("test").is_dir();

    if has_src && path.join("pom.xml").is_file() {
        return Ok(Some(ExerciseLayout::Maven));
    }
    if has_src
        && (path.join("build.gradle").is_file() || path.join("build.gradle.kts").is_file())
    {
        return Ok(Some(ExerciseLayout::Gradle));
    }
    if !(has_src && has_test) {
        return Ok(None);
    }
    if path.join("build.xml").is_file() {
        return Ok(Some(ExerciseLayout::Ant));
    }
    if path.join("tmc").is_dir() || path.join("setup.py").is_file() {
        return Ok(Some(ExerciseLayout::Python));
    }
    if path.join("Makefile").is_file() {
        return Ok(Some(ExerciseLayout::Make));
    }
    Ok(Some(ExerciseLayout::Plain))
}

/// [`ExerciseDetector`] backed by [`detect_layout`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutDetector;

impl ExerciseDetector for LayoutDetector {
    fn is_exercise(&self, dir: &Path) -> Result<bool, ScanError> {
        let layout = detect_layout(dir)?;
        if let Some(layout) = layout {
            tracing::debug!("{} detected as {:?} exercise", dir.display(), layout);
        }
        Ok(layout.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_is_not_an_exercise() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_layout(&dir.path().join("nope")).unwrap(), None);
    }

    #[test]
    fn regular_file_is_not_an_exercise() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("pom.xml");
        fs::write(&file, "<project/>").unwrap();
        assert_eq!(detect_layout(&file).unwrap(), None);
    }

    #[test]
    fn detector_delegates_to_layout() {
        let dir = TempDir::new().unwrap();
        assert!(!LayoutDetector.is_exercise(dir.path()).unwrap());
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("test")).unwrap();
        assert!(LayoutDetector.is_exercise(dir.path()).unwrap());
    }
}
