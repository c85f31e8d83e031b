//! Per-course YAML store with exclusive locks and transactional saves.
//!
//! # Storage layout
//!
//! ```text
//! <store_root>/
//!   <course_name>.yaml    (one file per course, mode 0600)
//!   locks/
//!     <course_name>.lock  (advisory lock file, contents unused)
//! ```
//!
//! # Transactions
//!
//! [`CourseStore::begin`] takes an exclusive lock on the course and hands out
//! a [`CourseTransaction`] holding a working copy of the record. Mutations
//! only touch the working copy. [`CourseTransaction::commit`] writes it back
//! atomically (`.yaml.tmp` + rename); dropping the transaction without
//! committing discards every mutation. The lock is held until the
//! transaction is dropped, so a second `begin` on the same course blocks.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{io_err, StoreError};
use crate::types::{AvailablePoint, Course, CourseName, Exercise, ExerciseName};

const LOCKS_DIR: &str = "locks";

// ---------------------------------------------------------------------------
// 1. Store
// ---------------------------------------------------------------------------

/// Handle to a directory of course records.
#[derive(Debug, Clone)]
pub struct CourseStore {
    root: PathBuf,
}

impl CourseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<store_root>/<course>.yaml`: pure, no I/O.
    pub fn course_path(&self, name: &CourseName) -> PathBuf {
        self.root.join(format!("{}.yaml", name.0))
    }

    fn lock_path(&self, name: &CourseName) -> PathBuf {
        self.root.join(LOCKS_DIR).join(format!("{}.lock", name.0))
    }

    /// Load a single course record.
    ///
    /// Returns `StoreError::CourseNotFound` if absent,
    /// `StoreError::Parse` (with path + line context) if malformed YAML.
    pub fn load_course(&self, name: &CourseName) -> Result<Course, StoreError> {
        check_name(name)?;
        let path = self.course_path(name);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::CourseNotFound {
                    name: name.0.clone(),
                    path,
                })
            }
            Err(e) => return Err(io_err(&path, e)),
        };
        serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
    }

    /// Every course in the store, sorted by name.
    pub fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut entries: Vec<_> = std::fs::read_dir(&self.root)
            .map_err(|e| io_err(&self.root, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .collect();
        entries.sort_by_key(|e| e.file_name());

        let mut courses = Vec::new();
        for entry in entries {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            let course: Course = serde_yaml::from_str(&contents)
                .map_err(|e| StoreError::Parse { path: path.clone(), source: e })?;
            courses.push(course);
        }
        Ok(courses)
    }

    /// Register a new course. Fails with `CourseExists` if the name is taken.
    pub fn create_course(&self, course: Course) -> Result<Course, StoreError> {
        let _lock = self.lock(&course.name)?;
        if self.course_path(&course.name).exists() {
            return Err(StoreError::CourseExists {
                name: course.name.0.clone(),
            });
        }
        self.save(&course)?;
        Ok(course)
    }

    /// Lock `name` exclusively and open a transaction over its record.
    ///
    /// Blocks while another transaction on the same course is open.
    pub fn begin(&self, name: &CourseName) -> Result<CourseTransaction, StoreError> {
        let lock = self.lock(name)?;
        let course = self.load_course(name)?;
        Ok(CourseTransaction {
            store: self.clone(),
            _lock: lock,
            course,
        })
    }

    /// Non-blocking [`begin`](Self::begin): `Ok(None)` if the course is
    /// already locked by another transaction.
    pub fn try_begin(&self, name: &CourseName) -> Result<Option<CourseTransaction>, StoreError> {
        let Some(lock) = self.try_lock(name)? else {
            return Ok(None);
        };
        let course = self.load_course(name)?;
        Ok(Some(CourseTransaction {
            store: self.clone(),
            _lock: lock,
            course,
        }))
    }

    fn open_lock_file(&self, name: &CourseName) -> Result<(PathBuf, File), StoreError> {
        check_name(name)?;
        let path = self.lock_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            set_dir_permissions(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        Ok((path, file))
    }

    fn lock(&self, name: &CourseName) -> Result<CourseLock, StoreError> {
        let (path, file) = self.open_lock_file(name)?;
        FileExt::lock_exclusive(&file).map_err(|e| io_err(&path, e))?;
        Ok(CourseLock { file })
    }

    fn try_lock(&self, name: &CourseName) -> Result<Option<CourseLock>, StoreError> {
        let (path, file) = self.open_lock_file(name)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(CourseLock { file })),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    /// Atomically save a course record.
    ///
    /// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
    fn save(&self, course: &Course) -> Result<(), StoreError> {
        check_name(&course.name)?;
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;
            set_dir_permissions(&self.root)?;
        }
        let path = self.course_path(&course.name);
        let tmp_path = path.with_file_name(format!("{}.yaml.tmp", course.name.0));

        let yaml = serde_yaml::to_string(course)?;
        std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
        set_file_permissions(&tmp_path)?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(io_err(&path, e));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 2. Lock
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct CourseLock {
    file: File,
}

impl Drop for CourseLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

// ---------------------------------------------------------------------------
// 3. Transaction
// ---------------------------------------------------------------------------

/// Locked working copy of one course record.
#[derive(Debug)]
pub struct CourseTransaction {
    store: CourseStore,
    _lock: CourseLock,
    course: Course,
}

impl CourseTransaction {
    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn course_mut(&mut self) -> &mut Course {
        &mut self.course
    }

    /// Record a new exercise. Names must be unique within the course.
    pub fn create_exercise(
        &mut self,
        name: ExerciseName,
        path: PathBuf,
    ) -> Result<&mut Exercise, StoreError> {
        if self.course.exercise(&name).is_some() {
            return Err(StoreError::Duplicate {
                kind: "exercise",
                name: name.0,
            });
        }
        self.course.exercises.push(Exercise::new(name, path));
        let idx = self.course.exercises.len() - 1;
        Ok(&mut self.course.exercises[idx])
    }

    /// Remove an exercise together with its available points.
    pub fn delete_exercise(&mut self, name: &ExerciseName) -> Result<Exercise, StoreError> {
        let idx = self
            .course
            .exercises
            .iter()
            .position(|e| &e.name == name)
            .ok_or_else(|| StoreError::Missing {
                kind: "exercise",
                name: name.0.clone(),
            })?;
        Ok(self.course.exercises.remove(idx))
    }

    /// Record a new available point on `exercise`.
    pub fn create_point(&mut self, exercise: &ExerciseName, point: &str) -> Result<(), StoreError> {
        let ex = self.exercise_mut(exercise)?;
        if ex.point_names().any(|p| p == point) {
            return Err(StoreError::Duplicate {
                kind: "point",
                name: format!("{exercise}/{point}"),
            });
        }
        ex.available_points.push(AvailablePoint {
            name: point.to_string(),
        });
        Ok(())
    }

    /// Remove an available point from `exercise`.
    pub fn delete_point(&mut self, exercise: &ExerciseName, point: &str) -> Result<(), StoreError> {
        let ex = self.exercise_mut(exercise)?;
        let before = ex.available_points.len();
        ex.available_points.retain(|p| p.name != point);
        if ex.available_points.len() == before {
            return Err(StoreError::Missing {
                kind: "point",
                name: format!("{exercise}/{point}"),
            });
        }
        Ok(())
    }

    fn exercise_mut(&mut self, name: &ExerciseName) -> Result<&mut Exercise, StoreError> {
        self.course
            .exercise_mut(name)
            .ok_or_else(|| StoreError::Missing {
                kind: "exercise",
                name: name.0.clone(),
            })
    }

    /// Persist the working copy and release the lock.
    pub fn commit(self) -> Result<Course, StoreError> {
        self.store.save(&self.course)?;
        Ok(self.course)
    }

    /// Discard the working copy and release the lock.
    pub fn rollback(self) {}
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn check_name(name: &CourseName) -> Result<(), StoreError> {
    if name.is_valid() {
        return Ok(());
    }
    Err(StoreError::InvalidName {
        name: name.0.clone(),
    })
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
