//! Course source synchronisation.
//!
//! A [`SourceClient`] materialises a course repository's working tree inside
//! the cache version being built. [`GitClient`] is the only backend: it
//! reuses the previous version's checkout when there is one (copy, then
//! fetch + forced checkout) and falls back to a fresh clone otherwise.

use std::fs;
use std::path::Path;
use std::process::Command;

use walkdir::WalkDir;

use courseware_core::{SourceBackend, SourceLocation};

use crate::error::{io_err, walk_err, RefreshError};
use crate::paths::remove_tree;

/// What a sync produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Commit id now checked out, when the backend can tell.
    pub revision: Option<String>,
}

/// Fetches course sources into a directory.
pub trait SourceClient {
    /// Materialise `source` at `dest` (which does not exist yet).
    ///
    /// `previous` is the checkout of the live cache version, if one exists on
    /// disk; it must not be modified.
    fn sync(
        &self,
        source: &SourceLocation,
        previous: Option<&Path>,
        dest: &Path,
    ) -> Result<SyncOutcome, RefreshError>;
}

/// Validate the backend named by a course's source location.
pub fn backend_of(source: &SourceLocation) -> Result<SourceBackend, RefreshError> {
    source
        .backend
        .parse()
        .map_err(|_| RefreshError::UnsupportedBackend {
            backend: source.backend.clone(),
        })
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

/// [`SourceClient`] shelling out to the `git` executable.
#[derive(Debug, Clone)]
pub struct GitClient {
    git: String,
}

impl Default for GitClient {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitClient {
    pub fn new(git: impl Into<String>) -> Self {
        Self { git: git.into() }
    }

    fn run(
        &self,
        source: &SourceLocation,
        cwd: Option<&Path>,
        args: &[&str],
    ) -> Result<String, RefreshError> {
        let mut cmd = Command::new(&self.git);
        cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        let output = cmd
            .output()
            .map_err(|e| sync_err(source, format!("cannot run {}: {e}", self.git)))?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(sync_err(
            source,
            format!("`git {}` failed ({}): {stderr}", args.join(" "), output.status),
        ))
    }

    fn clone_fresh(&self, source: &SourceLocation, dest: &Path) -> Result<(), RefreshError> {
        let dest_str = dest.to_string_lossy();
        self.run(
            source,
            None,
            &[
                "clone",
                "--quiet",
                "--single-branch",
                "--branch",
                &source.branch,
                "--",
                &source.url,
                &dest_str,
            ],
        )?;
        Ok(())
    }

    fn update_copy(
        &self,
        source: &SourceLocation,
        previous: &Path,
        dest: &Path,
    ) -> Result<(), RefreshError> {
        copy_tree(previous, dest)?;
        let remote_ref = format!("origin/{}", source.branch);
        let refspec = format!("+refs/heads/{0}:refs/remotes/origin/{0}", source.branch);
        self.run(source, Some(dest), &["remote", "set-url", "--", "origin", &source.url])?;
        self.run(source, Some(dest), &["fetch", "--quiet", "origin", &refspec])?;
        let branch = source.branch.as_str();
        self.run(source, Some(dest), &["checkout", "--quiet", "-f", "-B", branch, &remote_ref])?;
        self.run(source, Some(dest), &["clean", "-q", "-f", "-d", "-x"])?;
        Ok(())
    }
}

impl SourceClient for GitClient {
    fn sync(
        &self,
        source: &SourceLocation,
        previous: Option<&Path>,
        dest: &Path,
    ) -> Result<SyncOutcome, RefreshError> {
        check_branch(source)?;
        let reusable = previous.filter(|p| p.join(".git").is_dir());
        let mut updated = false;
        if let Some(previous) = reusable {
            match self.update_copy(source, previous, dest) {
                Ok(()) => updated = true,
                Err(e) => {
                    tracing::warn!("updating previous checkout failed, cloning afresh: {e}");
                    remove_tree(dest)?;
                }
            }
        }
        if !updated {
            self.clone_fresh(source, dest)?;
        }

        let revision = self.run(source, Some(dest), &["rev-parse", "HEAD"])?;
        tracing::info!("checked out {} at {}", source.url, revision);
        Ok(SyncOutcome {
            revision: Some(revision),
        })
    }
}

/// Branch names end up in refspecs and option values; one that git could
/// read as an option or that is not a plain ref name is refused.
fn check_branch(source: &SourceLocation) -> Result<(), RefreshError> {
    let branch = source.branch.as_str();
    let bad = branch.is_empty()
        || branch.starts_with('-')
        || branch.contains(':')
        || branch.contains("..")
        || branch.chars().any(|c| c.is_whitespace() || c.is_control());
    if bad {
        return Err(sync_err(source, format!("invalid branch name '{branch}'")));
    }
    Ok(())
}

fn sync_err(source: &SourceLocation, message: String) -> RefreshError {
    RefreshError::Sync {
        url: source.url.clone(),
        branch: source.branch.clone(),
        message,
    }
}

/// Recursively copy `src` to `dst`, preserving symlinks on unix.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), RefreshError> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| walk_err(src, e))?;
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(src) else {
            continue;
        };
        let target = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| io_err(&target, e))?;
        } else if file_type.is_file() {
            fs::copy(path, &target).map_err(|e| io_err(&target, e))?;
        } else if file_type.is_symlink() {
            copy_symlink(path, &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(path: &Path, target: &Path) -> Result<(), RefreshError> {
    let link = fs::read_link(path).map_err(|e| io_err(path, e))?;
    std::os::unix::fs::symlink(link, target).map_err(|e| io_err(target, e))
}

#[cfg(not(unix))]
fn copy_symlink(path: &Path, _target: &Path) -> Result<(), RefreshError> {
    tracing::debug!("skipping symlink {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .output()
            .expect("run git");
        assert!(
            status.status.success(),
            "git {args:?}: {}",
            String::from_utf8_lossy(&status.stderr)
        );
    }

    fn upstream() -> TempDir {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-q", "-b", "main"]);
        fs::write(dir.path().join("README"), "v1\n").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "v1"]);
        dir
    }

    fn location(dir: &Path, branch: &str) -> SourceLocation {
        SourceLocation::git(dir.to_string_lossy(), branch)
    }

    #[test]
    fn backend_validation() {
        assert_eq!(backend_of(&SourceLocation::git("u", "main")).unwrap(), SourceBackend::Git);
        let mut svn = SourceLocation::git("u", "main");
        svn.backend = "svn".to_string();
        assert!(matches!(
            backend_of(&svn),
            Err(RefreshError::UnsupportedBackend { backend }) if backend == "svn"
        ));
    }

    #[test]
    fn fresh_clone_reports_revision() {
        let up = upstream();
        let cache = TempDir::new().unwrap();
        let dest = cache.path().join("1").join("clone");

        let outcome = GitClient::default()
            .sync(&location(up.path(), "main"), None, &dest)
            .expect("sync");
        assert_eq!(fs::read_to_string(dest.join("README")).unwrap(), "v1\n");
        assert_eq!(outcome.revision.as_deref().map(str::len), Some(40));
    }

    #[test]
    fn update_from_previous_checkout_picks_up_new_commits() {
        let up = upstream();
        let cache = TempDir::new().unwrap();
        let first = cache.path().join("1");
        let second = cache.path().join("2");
        let client = GitClient::default();
        let loc = location(up.path(), "main");
        client.sync(&loc, None, &first).expect("first sync");

        fs::write(up.path().join("README"), "v2\n").unwrap();
        git(up.path(), &["commit", "-q", "-am", "v2"]);
        fs::write(first.join("scratch.txt"), "local junk").unwrap();

        client.sync(&loc, Some(&first), &second).expect("second sync");
        assert_eq!(fs::read_to_string(second.join("README")).unwrap(), "v2\n");
        assert!(!second.join("scratch.txt").exists(), "untracked files are cleaned");
        assert_eq!(
            fs::read_to_string(first.join("README")).unwrap(),
            "v1\n",
            "previous checkout is left untouched"
        );
    }

    #[test]
    fn unknown_branch_is_a_sync_error() {
        let up = upstream();
        let cache = TempDir::new().unwrap();
        let err = GitClient::default()
            .sync(&location(up.path(), "does-not-exist"), None, &cache.path().join("c"))
            .unwrap_err();
        assert!(matches!(err, RefreshError::Sync { .. }), "got {err:?}");
    }

    #[test]
    fn option_like_url_is_not_passed_as_an_option() {
        let scratch = TempDir::new().unwrap();
        let marker = scratch.path().join("marker");
        let url = format!("--upload-pack=touch {}", marker.display());
        let err = GitClient::default()
            .sync(&SourceLocation::git(url, "main"), None, &scratch.path().join("c"))
            .unwrap_err();
        assert!(matches!(err, RefreshError::Sync { .. }), "got {err:?}");
        assert!(!marker.exists(), "url must not be read as a git option");
    }

    #[test]
    fn option_like_branch_is_refused() {
        let up = upstream();
        let cache = TempDir::new().unwrap();
        for branch in ["", "-x", "--upload-pack=true", "a..b", "a b"] {
            let dest = cache.path().join("c");
            let err = GitClient::default()
                .sync(&location(up.path(), branch), None, &dest)
                .unwrap_err();
            match err {
                RefreshError::Sync { message, .. } => {
                    assert!(message.contains("invalid branch name"), "{branch}: {message}")
                }
                other => panic!("{branch}: expected sync error, got {other:?}"),
            }
            assert!(!dest.exists());
        }
    }

    #[test]
    fn missing_git_binary_is_a_sync_error() {
        let cache = TempDir::new().unwrap();
        let client = GitClient::new("/nonexistent/git-binary");
        let err = client
            .sync(&SourceLocation::git("u", "main"), None, &PathBuf::from(cache.path()).join("c"))
            .unwrap_err();
        assert!(matches!(err, RefreshError::Sync { .. }));
    }
}
