//! Grading-point discovery from test annotations.
//!
//! Recognised forms:
//!
//! ```text
//! @Points("1.1")            // Java, one or more space-separated names
//! @Points("1.2 1.3")
//! @points('2.1', '2.2')     # Python, any number of quoted arguments
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::{io_err, walk_err, PointScanner, ScanError};

const SCANNED_EXTENSIONS: &[&str] = &["java", "py"];

fn java_points() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"@Points\s*\(\s*"([^"]*)"\s*\)"#).expect("java points pattern")
    })
}

fn python_points() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@points\s*\(([^)]*)\)").expect("python points pattern"))
}

fn quoted() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("quoted string pattern"))
}

/// Collect the point names referenced in one source text.
pub fn points_in_source(source: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for caps in java_points().captures_iter(source) {
        add_names(&mut names, &caps[1]);
    }
    for caps in python_points().captures_iter(source) {
        for arg in quoted().captures_iter(&caps[1]) {
            if let Some(m) = arg.get(1).or_else(|| arg.get(2)) {
                add_names(&mut names, m.as_str());
            }
        }
    }
    names
}

fn add_names(names: &mut BTreeSet<String>, raw: &str) {
    names.extend(raw.split_whitespace().map(str::to_string));
}

/// [`PointScanner`] reading `@Points` / `@points` annotations from every
/// Java and Python source file below the exercise directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationScanner;

impl PointScanner for AnnotationScanner {
    fn scan_point_names(&self, exercise_dir: &Path) -> Result<BTreeSet<String>, ScanError> {
        let mut names = BTreeSet::new();
        let walker = WalkDir::new(exercise_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
        for entry in walker {
            let entry = entry.map_err(|e| walk_err(exercise_dir, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let scanned = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SCANNED_EXTENSIONS.contains(&ext));
            if !scanned {
                continue;
            }
            let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
            let found = points_in_source(&String::from_utf8_lossy(&bytes));
            if !found.is_empty() {
                tracing::debug!("{}: {} point(s)", path.display(), found.len());
            }
            names.extend(found);
        }
        Ok(names)
    }
}

pub(crate) fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
