//! Mode and group propagation over a freshly built cache version.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::RefreshError;
use crate::paths::CachePaths;

/// `chmod` / `chgrp` arguments to apply; `None` skips that step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSettings {
    /// Anything `chmod` accepts, e.g. `g+rwX` or `0750`.
    pub chmod: Option<String>,
    /// Group name or id.
    pub chgrp: Option<String>,
}

impl PermissionSettings {
    pub fn is_empty(&self) -> bool {
        self.chmod.is_none() && self.chgrp.is_none()
    }

    /// Apply recursively to `paths.version_root`, then to each ancestor up to
    /// and including `paths.cache_root`.
    pub fn apply(&self, paths: &CachePaths) -> Result<(), RefreshError> {
        if self.is_empty() {
            return Ok(());
        }
        let ancestors = ancestors_within(&paths.version_root, &paths.cache_root);
        for (tool, value) in [("chmod", &self.chmod), ("chgrp", &self.chgrp)] {
            let Some(value) = value else {
                continue;
            };
            tracing::info!("{tool} {value} on {}", paths.version_root.display());
            run(tool, &["-R", value], &paths.version_root)?;
            for dir in &ancestors {
                run(tool, &[value], dir)?;
            }
        }
        Ok(())
    }
}

/// Strict ancestors of `path`, nearest first, stopping at `root`.
fn ancestors_within(path: &Path, root: &Path) -> Vec<PathBuf> {
    path.ancestors()
        .skip(1)
        .take_while(|p| p.starts_with(root))
        .map(Path::to_path_buf)
        .collect()
}

fn run(tool: &str, args: &[&str], path: &Path) -> Result<(), RefreshError> {
    let output = Command::new(tool)
        .args(args)
        .arg(path)
        .output()
        .map_err(|e| RefreshError::Permissions {
            path: path.to_path_buf(),
            message: format!("cannot run {tool}: {e}"),
        })?;
    if output.status.success() {
        return Ok(());
    }
    Err(RefreshError::Permissions {
        path: path.to_path_buf(),
        message: format!(
            "`{tool} {}` failed ({}): {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseware_core::CourseName;
    use tempfile::TempDir;

    #[test]
    fn ancestors_stop_at_cache_root() {
        let got = ancestors_within(Path::new("/srv/cache/java/3"), Path::new("/srv/cache"));
        assert_eq!(
            got,
            vec![PathBuf::from("/srv/cache/java"), PathBuf::from("/srv/cache")]
        );
    }

    #[test]
    fn unset_settings_do_nothing() {
        let paths = CachePaths::new(Path::new("/does/not/exist"), &CourseName::from("c"), 1);
        PermissionSettings::default().apply(&paths).expect("no-op");
    }

    #[cfg(unix)]
    #[test]
    fn chmod_reaches_tree_and_ancestors() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let cache_root = root.path().join("cache");
        let paths = CachePaths::new(&cache_root, &CourseName::from("c"), 1);
        paths.create_skeleton().unwrap();
        let file = paths.stub_root.join("f.txt");
        std::fs::write(&file, "x").unwrap();

        let settings = PermissionSettings {
            chmod: Some("0750".into()),
            chgrp: None,
        };
        settings.apply(&paths).expect("chmod");

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&file), 0o750);
        assert_eq!(mode(&paths.version_root), 0o750);
        assert_eq!(mode(&cache_root.join("c")), 0o750);
        assert_eq!(mode(&cache_root), 0o750);
        assert_ne!(mode(root.path()), 0o750, "stops at the cache root");
    }

    #[cfg(unix)]
    #[test]
    fn unknown_group_is_a_permissions_error() {
        let root = TempDir::new().unwrap();
        let paths = CachePaths::new(root.path(), &CourseName::from("c"), 1);
        paths.create_skeleton().unwrap();
        let settings = PermissionSettings {
            chmod: None,
            chgrp: Some("no-such-group-courseware".into()),
        };
        let err = settings.apply(&paths).unwrap_err();
        assert!(matches!(err, RefreshError::Permissions { .. }), "got {err:?}");
    }
}
