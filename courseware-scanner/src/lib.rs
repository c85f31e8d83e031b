//! Exercise-level collaborators for the refresh pipeline.
//!
//! The pipeline only talks to the three traits below; the structs exported
//! alongside them are the implementations the `courseware` binary wires in.
//!
//! - [`ExerciseDetector`]: decides whether a directory is an exercise root
//!   ([`LayoutDetector`]).
//! - [`PointScanner`]: lists the grading points an exercise's tests award
//!   ([`AnnotationScanner`]).
//! - [`FileFilter`]: produces solution and stub trees from an exercise
//!   source tree ([`MarkerFilter`]).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod detect;
pub mod filter;
pub mod points;

pub use detect::{detect_layout, ExerciseLayout, LayoutDetector};
pub use filter::MarkerFilter;
pub use points::AnnotationScanner;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Recognises exercise directories in a course checkout.
pub trait ExerciseDetector {
    fn is_exercise(&self, dir: &Path) -> Result<bool, ScanError>;
}

/// Extracts the distinct grading-point names referenced by an exercise's tests.
pub trait PointScanner {
    fn scan_point_names(&self, exercise_dir: &Path) -> Result<BTreeSet<String>, ScanError>;
}

/// Splits an exercise source tree into its solution and stub variants.
///
/// `dst` may already exist; implementations create whatever lies below it.
pub trait FileFilter {
    fn make_solution(&self, src: &Path, dst: &Path) -> Result<(), ScanError>;
    fn make_stub(&self, src: &Path, dst: &Path) -> Result<(), ScanError>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from detection, scanning and filtering.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{path}:{line}: `BEGIN SOLUTION` without matching `END SOLUTION`")]
    UnterminatedSolution { path: PathBuf, line: usize },

    #[error("{path}:{line}: `END SOLUTION` without matching `BEGIN SOLUTION`")]
    UnexpectedEndSolution { path: PathBuf, line: usize },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ScanError {
    ScanError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn walk_err(path: impl Into<PathBuf>, source: walkdir::Error) -> ScanError {
    ScanError::Walk {
        path: path.into(),
        source,
    }
}
