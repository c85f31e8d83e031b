//! Courseware settings loaded from `~/.courseware/config.yaml`.
//!
//! Every key is optional; a missing file yields the defaults. Relative
//! directories in the file are resolved against the settings directory.
//!
//! ```yaml
//! store_root: /srv/courseware/courses
//! cache_root: /srv/courseware/cache
//! chmod: g+rwX
//! chgrp: staff
//! git: /usr/bin/git
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};
use crate::store::CourseStore;

const SETTINGS_DIR: &str = ".courseware";
const SETTINGS_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSettings {
    store_root: Option<PathBuf>,
    cache_root: Option<PathBuf>,
    chmod: Option<String>,
    chgrp: Option<String>,
    git: Option<String>,
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Directory holding course records.
    pub store_root: PathBuf,
    /// Directory under which `<course>/<version>/` cache trees live.
    pub cache_root: PathBuf,
    /// Mode applied to new cache trees (`chmod` syntax). `None` skips.
    pub chmod: Option<String>,
    /// Group applied to new cache trees. `None` skips.
    pub chgrp: Option<String>,
    /// Git executable.
    pub git: String,
}

impl Settings {
    /// Defaults rooted at `<home>/.courseware/`.
    pub fn defaults_at(home: &Path) -> Self {
        let base = settings_dir_at(home);
        Self {
            store_root: base.join("courses"),
            cache_root: base.join("cache"),
            chmod: None,
            chgrp: None,
            git: "git".to_string(),
        }
    }

    pub fn store(&self) -> CourseStore {
        CourseStore::new(&self.store_root)
    }
}

/// `<home>/.courseware/`
pub fn settings_dir_at(home: &Path) -> PathBuf {
    home.join(SETTINGS_DIR)
}

/// `<home>/.courseware/config.yaml`
pub fn settings_path_at(home: &Path) -> PathBuf {
    settings_dir_at(home).join(SETTINGS_FILE)
}

/// Load settings for `home`, falling back to defaults when no file exists.
///
/// Empty strings for `chmod` / `chgrp` count as unset.
pub fn load_at(home: &Path) -> Result<Settings, StoreError> {
    let path = settings_path_at(home);
    let defaults = Settings::defaults_at(home);
    if !path.exists() {
        return Ok(defaults);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let raw: RawSettings = if contents.trim().is_empty() {
        RawSettings::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse {
            path: path.clone(),
            source: e,
        })?
    };

    let base = settings_dir_at(home);
    let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
    Ok(Settings {
        store_root: raw.store_root.map(resolve).unwrap_or(defaults.store_root),
        cache_root: raw.cache_root.map(resolve).unwrap_or(defaults.cache_root),
        chmod: raw.chmod.filter(|s| !s.trim().is_empty()),
        chgrp: raw.chgrp.filter(|s| !s.trim().is_empty()),
        git: raw.git.unwrap_or(defaults.git),
    })
}

/// `load_at` convenience wrapper using `dirs::home_dir()`.
pub fn load() -> Result<Settings, StoreError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}
