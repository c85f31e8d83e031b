//! Solution and stub trees.

use courseware_core::Exercise;
use courseware_scanner::FileFilter;

use crate::error::{io_err, RefreshError};
use crate::paths::CachePaths;

/// Build `solutions/<path>` and `stubs/<path>` for each exercise from its
/// checkout under `clone/<path>`.
pub fn build_artifacts<'a>(
    paths: &CachePaths,
    exercises: impl IntoIterator<Item = &'a Exercise>,
    filter: &dyn FileFilter,
) -> Result<(), RefreshError> {
    for exercise in exercises {
        let src = paths.exercise_clone(exercise);
        let solution = paths.exercise_solution(exercise);
        let stub = paths.exercise_stub(exercise);
        for dir in [&solution, &stub] {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }

        tracing::debug!("building artifacts for '{}'", exercise.name);
        filter.make_solution(&src, &solution)?;
        filter.make_stub(&src, &stub)?;
    }
    Ok(())
}
