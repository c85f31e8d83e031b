//! Error types for courseware-refresh.

use std::path::PathBuf;

use thiserror::Error;

use courseware_core::StoreError;
use courseware_scanner::ScanError;

/// All errors that can arise from refresh stages.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The course names a source backend other than `git`.
    #[error("unsupported source backend '{backend}'")]
    UnsupportedBackend { backend: String },

    /// Fetching the course source failed.
    #[error("failed to sync source from {url} ({branch}): {message}")]
    Sync {
        url: String,
        branch: String,
        message: String,
    },

    /// `course_options.yml` or a `metadata.yml` could not be parsed.
    #[error("failed to parse {path}: {source}")]
    Options {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An options file parsed but is not a key → value mapping.
    #[error("{path} must contain a mapping of option names to values")]
    OptionsShape { path: PathBuf },

    /// Applying `chmod` / `chgrp` failed.
    #[error("failed to set permissions on {path}: {message}")]
    Permissions { path: PathBuf, message: String },

    /// An error from the course store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An error from a detection, scanning or filtering collaborator.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Convenience constructor for [`RefreshError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RefreshError {
    RefreshError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`RefreshError::Walk`].
pub(crate) fn walk_err(path: impl Into<PathBuf>, source: walkdir::Error) -> RefreshError {
    RefreshError::Walk {
        path: path.into(),
        source,
    }
}
