//! The refresh orchestrator.
//!
//! ## `refresh_course`: stages
//!
//! 1. Lock the course and open a transaction over its record.
//! 2. Validate the source backend (nothing on disk is touched before this).
//! 3. Bump `cache_version` from `old` to `new` in the working copy and lay out
//!    an empty tree for `new`, removing anything already there.
//! 4. Sync the source into `new/clone`, reusing `old/clone` when present.
//! 5. Scan metadata and apply roster, options and points to the working copy.
//! 6. Build solution and stub trees.
//! 7. Checksum and package every stub tree.
//! 8. Propagate permissions.
//! 9. No errors: commit, then delete every other version on disk.
//!    Any error: delete `new` and roll back.
//!
//! The lock is held from step 1 until the transaction ends.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;

use courseware_core::{Course, CourseName, CourseStore, CourseTransaction, ExerciseName, Settings};
use courseware_scanner::{
    AnnotationScanner, ExerciseDetector, FileFilter, LayoutDetector, MarkerFilter, PointScanner,
};

use crate::artifacts::build_artifacts;
use crate::checksum::{checksum, stub_entries};
use crate::error::RefreshError;
use crate::metadata::{points_diff, roster_diff, CourseMetadata, MetadataSync};
use crate::package::write_archive;
use crate::paths::{versions_on_disk, CachePaths};
use crate::permissions::PermissionSettings;
use crate::report::{Failure, Report};
use crate::source::{backend_of, GitClient, SourceClient};

/// Refreshes courses from their sources into the versioned cache.
pub struct Refresher {
    store: CourseStore,
    cache_root: PathBuf,
    permissions: PermissionSettings,
    source: Box<dyn SourceClient>,
    detector: Box<dyn ExerciseDetector>,
    scanner: Box<dyn PointScanner>,
    filter: Box<dyn FileFilter>,
}

impl Refresher {
    /// A refresher using `git`, [`LayoutDetector`], [`AnnotationScanner`] and
    /// [`MarkerFilter`], with no permission propagation.
    pub fn new(store: CourseStore, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            cache_root: cache_root.into(),
            permissions: PermissionSettings::default(),
            source: Box::new(GitClient::default()),
            detector: Box::new(LayoutDetector),
            scanner: Box::new(AnnotationScanner),
            filter: Box::new(MarkerFilter),
        }
    }

    /// A refresher configured from user settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.store(), &settings.cache_root)
            .with_source(GitClient::new(&settings.git))
            .with_permissions(PermissionSettings {
                chmod: settings.chmod.clone(),
                chgrp: settings.chgrp.clone(),
            })
    }

    pub fn with_permissions(mut self, permissions: PermissionSettings) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_source(mut self, source: impl SourceClient + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn with_detector(mut self, detector: impl ExerciseDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_scanner(mut self, scanner: impl PointScanner + 'static) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    pub fn with_filter(mut self, filter: impl FileFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn store(&self) -> &CourseStore {
        &self.store
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Cache paths of the version `course` currently points at.
    pub fn current_paths(&self, course: &Course) -> CachePaths {
        CachePaths::new(&self.cache_root, &course.name, course.cache_version)
    }

    /// Refresh `course` and replace it with the record as persisted afterwards.
    ///
    /// Returns the report on success, which may carry warnings. With any
    /// error the persisted record and the cache on disk are left as they were
    /// and the report comes back inside [`Failure`].
    pub fn refresh_course(&self, course: &mut Course) -> Result<Report, Failure> {
        let name = course.name.clone();
        let mut report = Report::default();
        tracing::info!("refreshing course '{name}'");

        let mut tx = match self.store.begin(&name) {
            Ok(tx) => tx,
            Err(e) => {
                report.error(format!("cannot open course '{name}': {e}"));
                return Err(report.into());
            }
        };

        let old = tx.course().cache_version;
        let new = old + 1;
        let old_paths = CachePaths::new(&self.cache_root, &name, old);
        let new_paths = CachePaths::new(&self.cache_root, &name, new);

        let staged = match backend_of(&tx.course().source) {
            Ok(backend) => {
                tracing::debug!("source backend {backend}, version {old} -> {new}");
                tx.course_mut().cache_version = new;
                if let Err(e) = self.run_stages(&mut tx, &old_paths, &new_paths, &mut report) {
                    report.error(e.to_string());
                }
                true
            }
            Err(e) => {
                report.error(e.to_string());
                false
            }
        };

        if report.successful() {
            tx.course_mut().refreshed_at = Some(Utc::now());
            match tx.commit() {
                Ok(committed) => {
                    tracing::info!("course '{name}' now at cache version {new}");
                    *course = committed;
                    self.collect_garbage(&name, new, &mut report);
                    return Ok(report);
                }
                Err(e) => {
                    report.error(format!("failed to save course '{name}': {e}"));
                    discard(&new_paths, &mut report);
                }
            }
        } else {
            tx.rollback();
            // Only this attempt's version is removed here. Strays left by
            // earlier crashed attempts go at the next successful commit.
            if staged {
                discard(&new_paths, &mut report);
            }
        }

        match self.store.load_course(&name) {
            Ok(persisted) => *course = persisted,
            Err(e) => report.warning(format!("cannot reload course '{name}': {e}")),
        }
        Err(report.into())
    }

    fn run_stages(
        &self,
        tx: &mut CourseTransaction,
        old_paths: &CachePaths,
        new_paths: &CachePaths,
        report: &mut Report,
    ) -> Result<(), RefreshError> {
        new_paths.remove()?;
        new_paths.create_skeleton()?;

        let previous = Some(old_paths.clone_root.as_path()).filter(|p| p.is_dir());
        let source = tx.course().source.clone();
        tracing::info!("syncing {} ({})", source.url, source.branch);
        let outcome = self.source.sync(&source, previous, &new_paths.clone_root)?;
        tx.course_mut().head_revision = outcome.revision;

        tracing::info!("scanning exercise metadata");
        let metadata = MetadataSync {
            detector: self.detector.as_ref(),
            scanner: self.scanner.as_ref(),
        }
        .scan(&new_paths.clone_root, report)?;
        let built = apply_metadata(tx, metadata)?;

        tracing::info!("building solutions and stubs for {} exercise(s)", built.len());
        let course = tx.course();
        build_artifacts(
            new_paths,
            course.exercises.iter().filter(|e| built.contains(&e.name)),
            self.filter.as_ref(),
        )?;

        tracing::info!("computing checksums and archives");
        for name in &built {
            let Some(exercise) = tx.course().exercise(name) else {
                continue;
            };
            let entries = stub_entries(&new_paths.exercise_stub(exercise))?;
            let digest = checksum(&entries)?;
            write_archive(exercise, &entries, &new_paths.exercise_archive(exercise))?;
            if let Some(exercise) = tx.course_mut().exercise_mut(name) {
                exercise.checksum = digest;
            }
        }

        self.permissions.apply(new_paths)
    }

    /// Delete every version of `course` on disk other than `live`.
    fn collect_garbage(&self, course: &CourseName, live: u64, report: &mut Report) {
        let versions = match versions_on_disk(&self.cache_root, course) {
            Ok(versions) => versions,
            Err(e) => {
                report.warning(format!("cannot list old cache versions: {e}"));
                return;
            }
        };
        for version in versions.into_iter().filter(|v| *v != live) {
            let paths = CachePaths::new(&self.cache_root, course, version);
            match paths.remove() {
                Ok(()) => tracing::debug!("removed cache version {version}"),
                Err(e) => report.warning(format!("failed to remove old cache version: {e}")),
            }
        }
    }
}

/// Apply scanned metadata to the working copy.
///
/// Returns the exercises whose metadata resolved, which are the ones that get
/// artifacts built.
fn apply_metadata(
    tx: &mut CourseTransaction,
    metadata: CourseMetadata,
) -> Result<BTreeSet<ExerciseName>, RefreshError> {
    tx.course_mut().options = metadata.options;

    let roster = roster_diff(tx.course(), &metadata.discovered);
    for name in &roster.delete {
        tracing::info!("removing exercise '{name}'");
        tx.delete_exercise(name)?;
    }
    for (name, path) in roster.create {
        tracing::info!("adding exercise '{name}'");
        tx.create_exercise(name, path)?;
    }

    let mut built = BTreeSet::new();
    for resolved in metadata.exercises {
        let Some(exercise) = tx.course_mut().exercise_mut(&resolved.name) else {
            continue;
        };
        exercise.path = resolved.path;
        exercise.options = resolved.options;
        let diff = points_diff(exercise, &resolved.points);
        for point in &diff.delete {
            tx.delete_point(&resolved.name, point)?;
        }
        for point in &diff.create {
            tx.create_point(&resolved.name, point)?;
        }
        built.insert(resolved.name);
    }

    tx.course_mut().exercises.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(built)
}

fn discard(paths: &CachePaths, report: &mut Report) {
    if let Err(e) = paths.remove() {
        report.error(format!("failed to remove incomplete cache version: {e}"));
    }
}
