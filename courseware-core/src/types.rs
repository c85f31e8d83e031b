//! Domain types for the course store.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! All types are serializable/deserializable via serde + serde_yaml.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key → value option mapping, as read from `course_options.yml` / `metadata.yml`.
pub type Options = BTreeMap<String, serde_yaml::Value>;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed course name. Unique within a store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CourseName(pub String);

impl CourseName {
    /// Whether the name is usable as a single file-name component under the
    /// store and cache roots: non-empty, no separators or NUL, not `.`/`..`.
    pub fn is_valid(&self) -> bool {
        let name = self.0.as_str();
        if name.is_empty() || name.contains(['/', '\\', '\0']) {
            return false;
        }
        let mut components = Path::new(name).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }
}

impl fmt::Display for CourseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CourseName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CourseName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed exercise name. Unique within a course.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExerciseName(pub String);

impl ExerciseName {
    /// Derive an exercise name from its path relative to the course root.
    ///
    /// Path components are joined with `-`: `loops/ForLoop` → `loops-ForLoop`.
    pub fn from_relative_path(path: &Path) -> Self {
        let parts: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Self(parts.join("-"))
    }
}

impl fmt::Display for ExerciseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ExerciseName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ExerciseName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Version-control backends a course source can be fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceBackend {
    #[default]
    Git,
}

impl fmt::Display for SourceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceBackend::Git => write!(f, "git"),
        }
    }
}

impl FromStr for SourceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(Self::Git),
            other => Err(format!("unsupported source backend '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Where a course's exercises come from.
///
/// `backend` is kept as free text so that a record naming an unknown backend
/// still loads; it is validated when a refresh starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub backend: String,
    pub url: String,
    pub branch: String,
}

impl SourceLocation {
    pub fn git(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            backend: SourceBackend::Git.to_string(),
            url: url.into(),
            branch: branch.into(),
        }
    }
}

/// A grading-point label an exercise's tests can award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailablePoint {
    pub name: String,
}

/// A single exercise within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: ExerciseName,
    /// Path of the exercise directory relative to the course root.
    pub path: PathBuf,
    #[serde(default)]
    pub options: Options,
    /// Hex digest of the exercise's stub tree. Empty until first packaged.
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub available_points: Vec<AvailablePoint>,
    pub created_at: DateTime<Utc>,
}

impl Exercise {
    pub fn new(name: ExerciseName, path: PathBuf) -> Self {
        Self {
            name,
            path,
            options: Options::new(),
            checksum: String::new(),
            available_points: vec![],
            created_at: Utc::now(),
        }
    }

    pub fn point_names(&self) -> impl Iterator<Item = &str> {
        self.available_points.iter().map(|p| p.name.as_str())
    }
}

/// A course: the unit of refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub name: CourseName,
    pub source: SourceLocation,
    /// Selects the live on-disk cache tree. Only ever increases.
    #[serde(default)]
    pub cache_version: u64,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    /// Commit id checked out by the last successful refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_revision: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Course {
    pub fn new(name: CourseName, source: SourceLocation) -> Self {
        Self {
            name,
            source,
            cache_version: 0,
            options: Options::new(),
            exercises: vec![],
            head_revision: None,
            created_at: Utc::now(),
            refreshed_at: None,
        }
    }

    pub fn exercise(&self, name: &ExerciseName) -> Option<&Exercise> {
        self.exercises.iter().find(|e| &e.name == name)
    }

    pub fn exercise_mut(&mut self, name: &ExerciseName) -> Option<&mut Exercise> {
        self.exercises.iter_mut().find(|e| &e.name == name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
