//! # courseware-refresh
//!
//! Builds a new cache version of a course and swaps it in atomically.
//!
//! Call [`Refresher::refresh_course`] to sync a course's source, reconcile its
//! exercises, build solution and stub trees, checksum and package the stubs,
//! and commit the result, or leave everything as it was if any step failed.

pub mod artifacts;
pub mod checksum;
pub mod error;
pub mod metadata;
pub mod package;
pub mod paths;
pub mod permissions;
pub mod refresh;
pub mod report;
pub mod source;

pub use error::RefreshError;
pub use paths::CachePaths;
pub use permissions::PermissionSettings;
pub use refresh::Refresher;
pub use report::{Failure, Report};
pub use source::{GitClient, SourceClient, SyncOutcome};
