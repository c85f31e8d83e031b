//! Error types for courseware-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from course store and settings operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.courseware/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No record exists for the named course.
    #[error("course '{name}' not found at {path}")]
    CourseNotFound { name: String, path: PathBuf },

    /// The course name cannot be used as a file name under the store root.
    #[error("invalid course name '{name}': must be a single path component")]
    InvalidName { name: String },

    /// A record for the named course already exists.
    #[error("course '{name}' already exists")]
    CourseExists { name: String },

    /// Exercise or point bookkeeping violated a uniqueness rule.
    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    /// Tried to delete an exercise or point that is not recorded.
    #[error("{kind} '{name}' not found")]
    Missing { kind: &'static str, name: String },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
