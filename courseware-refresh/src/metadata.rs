//! Course metadata derived from a checkout.
//!
//! Everything here reads the clone tree and returns values; the orchestrator
//! applies them to the course record inside its transaction.
//!
//! - `course_options.yml` at the clone root overlays [`default_course_options`].
//! - `metadata.yml` files from the clone root down to each exercise overlay
//!   [`default_exercise_options`], deeper files winning.
//! - Exercise directories are found with an [`ExerciseDetector`] and named by
//!   [`ExerciseName::from_relative_path`].
//! - Available points come from a [`PointScanner`].

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use walkdir::WalkDir;

use courseware_core::{Course, Exercise, ExerciseName, Options};
use courseware_scanner::{ExerciseDetector, PointScanner};

use crate::error::{io_err, walk_err, RefreshError};
use crate::report::Report;

pub const COURSE_OPTIONS_FILE: &str = "course_options.yml";
pub const METADATA_FILE: &str = "metadata.yml";

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Built-in course options. Keys outside this set are ignored.
pub fn default_course_options() -> Options {
    options_from(&[
        ("hidden", Value::Bool(false)),
        ("hide_after", Value::Null),
        ("hidden_if_registered_after", Value::Null),
        ("locked_exercise_points_visible", Value::Bool(true)),
        ("paste_visibility", Value::Null),
        ("formal_name", Value::Null),
        ("certificate_downloadable", Value::Bool(false)),
    ])
}

/// Built-in exercise options, the base of every `metadata.yml` chain.
pub fn default_exercise_options() -> Options {
    options_from(&[
        ("deadline", Value::Null),
        ("soft_deadline", Value::Null),
        ("publish_time", Value::Null),
        ("gdocs_sheet", Value::Null),
        ("points_visible", Value::Bool(true)),
        ("hidden", Value::Bool(false)),
        ("returnable", Value::Null),
        ("solution_visible_after", Value::Null),
        ("valgrind_strategy", Value::String("fail".to_string())),
        ("runtime_params", Value::Sequence(vec![])),
        ("code_review_requests_enabled", Value::Bool(true)),
        ("run_tests_locally_action_enabled", Value::Bool(true)),
    ])
}

fn options_from(pairs: &[(&str, Value)]) -> Options {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Options files
// ---------------------------------------------------------------------------

/// Read one options file. `Ok(None)` if it does not exist; an empty file is
/// an empty mapping.
pub fn read_options_file(path: &Path) -> Result<Option<Options>, RefreshError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    let value: Value = serde_yaml::from_str(&contents).map_err(|e| RefreshError::Options {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mapping = match value {
        Value::Null => return Ok(Some(Options::new())),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(RefreshError::OptionsShape {
                path: path.to_path_buf(),
            })
        }
    };

    let mut options = Options::new();
    for (key, value) in mapping {
        let Value::String(key) = key else {
            return Err(RefreshError::OptionsShape {
                path: path.to_path_buf(),
            });
        };
        options.insert(key, value);
    }
    Ok(Some(options))
}

/// Overlay `overlay` onto `base`. Nested mappings merge key by key; any
/// other value in `overlay` replaces the one in `base`.
pub fn merge_options(base: &mut Options, overlay: Options) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                merge_mappings(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn merge_mappings(base: &mut serde_yaml::Mapping, overlay: serde_yaml::Mapping) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(incoming)) => {
                merge_mappings(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Course options: defaults overlaid with `course_options.yml`, if present.
///
/// Keys the defaults do not know are dropped with a warning.
pub fn load_course_options(
    clone_root: &Path,
    report: &mut Report,
) -> Result<Options, RefreshError> {
    let mut options = default_course_options();
    let path = clone_root.join(COURSE_OPTIONS_FILE);
    let Some(file) = read_options_file(&path)? else {
        tracing::debug!("no {COURSE_OPTIONS_FILE}; using defaults");
        return Ok(options);
    };

    let (known, unknown): (BTreeMap<_, _>, BTreeMap<_, _>) =
        file.into_iter().partition(|(k, _)| options.contains_key(k));
    for key in unknown.keys() {
        report.warning(format!("ignoring unknown course option '{key}' in {COURSE_OPTIONS_FILE}"));
    }
    merge_options(&mut options, known);
    Ok(options)
}

/// Exercise options: defaults overlaid with every `metadata.yml` from the
/// clone root down to `exercise_path` (relative to the clone root).
pub fn resolve_exercise_options(
    clone_root: &Path,
    exercise_path: &Path,
) -> Result<Options, RefreshError> {
    let mut options = default_exercise_options();
    let mut dir = clone_root.to_path_buf();
    let mut levels = vec![dir.clone()];
    for component in exercise_path.components() {
        dir.push(component);
        levels.push(dir.clone());
    }
    for level in levels {
        if let Some(file) = read_options_file(&level.join(METADATA_FILE))? {
            merge_options(&mut options, file);
        }
    }
    Ok(options)
}

// ---------------------------------------------------------------------------
// Roster & points
// ---------------------------------------------------------------------------

/// Exercise directories below `clone_root`, relative to it, in path order.
///
/// Hidden directories are skipped and exercises are not searched for nested
/// exercises.
pub fn discover_exercises(
    clone_root: &Path,
    detector: &dyn ExerciseDetector,
) -> Result<Vec<PathBuf>, RefreshError> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(clone_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| walk_err(clone_root, e))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if detector.is_exercise(entry.path())? {
            if let Ok(rel) = entry.path().strip_prefix(clone_root) {
                found.push(rel.to_path_buf());
            }
            walker.skip_current_dir();
        }
    }
    Ok(found)
}

/// Exercises to create and to delete so that the roster matches `discovered`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    pub create: Vec<(ExerciseName, PathBuf)>,
    pub delete: Vec<ExerciseName>,
}

/// Compare the recorded exercises with the discovered paths by exact name.
pub fn roster_diff(course: &Course, discovered: &[PathBuf]) -> RosterDiff {
    let discovered: BTreeMap<ExerciseName, &PathBuf> = discovered
        .iter()
        .map(|p| (ExerciseName::from_relative_path(p), p))
        .collect();
    let recorded: BTreeSet<&ExerciseName> = course.exercises.iter().map(|e| &e.name).collect();

    RosterDiff {
        create: discovered
            .iter()
            .filter(|(name, _)| !recorded.contains(name))
            .map(|(name, path)| (name.clone(), (*path).clone()))
            .collect(),
        delete: course
            .exercises
            .iter()
            .filter(|e| !discovered.contains_key(&e.name))
            .map(|e| e.name.clone())
            .collect(),
    }
}

/// Points to create and delete so that `exercise` matches `scanned`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointsDiff {
    pub create: Vec<String>,
    pub delete: Vec<String>,
}

pub fn points_diff(exercise: &Exercise, scanned: &BTreeSet<String>) -> PointsDiff {
    let recorded: BTreeSet<&str> = exercise.point_names().collect();
    PointsDiff {
        create: scanned
            .iter()
            .filter(|p| !recorded.contains(p.as_str()))
            .cloned()
            .collect(),
        delete: exercise
            .point_names()
            .filter(|p| !scanned.contains(*p))
            .map(str::to_string)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Whole-course scan
// ---------------------------------------------------------------------------

/// Metadata resolved for one exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseMetadata {
    pub name: ExerciseName,
    pub path: PathBuf,
    pub options: Options,
    pub points: BTreeSet<String>,
}

/// Everything MetadataSync learned from a checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseMetadata {
    pub options: Options,
    /// Every exercise directory on disk, including ones that failed below.
    pub discovered: Vec<PathBuf>,
    /// Exercises whose options and points resolved.
    pub exercises: Vec<ExerciseMetadata>,
    /// Exercises whose metadata could not be read; their errors are in the report.
    pub failed: Vec<ExerciseName>,
}

/// Reads course metadata from a checkout.
pub struct MetadataSync<'a> {
    pub detector: &'a dyn ExerciseDetector,
    pub scanner: &'a dyn PointScanner,
}

impl MetadataSync<'_> {
    /// Scan `clone_root`.
    ///
    /// A broken `course_options.yml` is fatal. A broken `metadata.yml`, a
    /// failing point scan or two directories sharing one exercise name is
    /// recorded against that exercise only and the scan moves on.
    pub fn scan(
        &self,
        clone_root: &Path,
        report: &mut Report,
    ) -> Result<CourseMetadata, RefreshError> {
        let options = load_course_options(clone_root, report)?;
        let discovered = discover_exercises(clone_root, self.detector)?;
        tracing::info!("found {} exercise(s)", discovered.len());

        let mut exercises = Vec::new();
        let mut failed = Vec::new();
        let mut claimed: BTreeMap<ExerciseName, &PathBuf> = BTreeMap::new();
        for path in &discovered {
            let name = ExerciseName::from_relative_path(path);
            if let Some(first) = claimed.get(&name) {
                report.error(format!(
                    "exercise directories '{}' and '{}' both map to the name '{name}'",
                    first.display(),
                    path.display()
                ));
                exercises.retain(|e: &ExerciseMetadata| e.name != name);
                if !failed.contains(&name) {
                    failed.push(name);
                }
                continue;
            }
            claimed.insert(name.clone(), path);
            match self.scan_exercise(clone_root, path) {
                Ok((options, points)) => {
                    if points.is_empty() {
                        report.warning(format!("exercise '{name}' has no available points"));
                    }
                    exercises.push(ExerciseMetadata {
                        name,
                        path: path.clone(),
                        options,
                        points,
                    });
                }
                Err(e) => {
                    report.error(format!("failed to load metadata for exercise '{name}': {e}"));
                    failed.push(name);
                }
            }
        }

        Ok(CourseMetadata {
            options,
            discovered,
            exercises,
            failed,
        })
    }

    fn scan_exercise(
        &self,
        clone_root: &Path,
        path: &Path,
    ) -> Result<(Options, BTreeSet<String>), RefreshError> {
        let options = resolve_exercise_options(clone_root, path)?;
        let points = self.scanner.scan_point_names(&clone_root.join(path))?;
        Ok((options, points))
    }
}
