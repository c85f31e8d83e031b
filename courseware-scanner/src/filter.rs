//! Marker-comment solution/stub filter.
//!
//! Source files are rewritten line by line according to comment markers:
//!
//! | Marker                    | Solution          | Stub                      |
//! |---------------------------|-------------------|---------------------------|
//! | `// SOLUTION FILE`        | marker dropped    | whole file omitted        |
//! | `// BEGIN SOLUTION` … `// END SOLUTION` | markers dropped | block dropped |
//! | `// STUB: code`           | line dropped      | replaced by `code`        |
//!
//! `#` works in place of `//`. Files with other extensions and non-UTF-8
//! files are copied byte for byte. Hidden entries (`.git`, `.gitignore`, …)
//! are never copied.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::points::is_hidden;
use crate::{io_err, walk_err, FileFilter, ScanError};

const FILTERED_EXTENSIONS: &[&str] = &[
    "java", "py", "c", "h", "cpp", "hpp", "js", "ts", "rb", "rs", "kt", "scala", "cs",
];

const SOLUTION_FILE: &str = "SOLUTION FILE";
const BEGIN_SOLUTION: &str = "BEGIN SOLUTION";
const END_SOLUTION: &str = "END SOLUTION";

fn stub_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\s*)(?://|#)\s*STUB:\s?(.*)$").expect("stub marker pattern")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Solution,
    Stub,
}

/// [`FileFilter`] driven by `SOLUTION FILE` / `BEGIN SOLUTION` / `STUB:` markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerFilter;

impl FileFilter for MarkerFilter {
    fn make_solution(&self, src: &Path, dst: &Path) -> Result<(), ScanError> {
        copy_variant(src, dst, Variant::Solution)
    }

    fn make_stub(&self, src: &Path, dst: &Path) -> Result<(), ScanError> {
        copy_variant(src, dst, Variant::Stub)
    }
}

fn copy_variant(src: &Path, dst: &Path, variant: Variant) -> Result<(), ScanError> {
    fs::create_dir_all(dst).map_err(|e| io_err(dst, e))?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name()));
    for entry in walker {
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
            copy_file(path, &target, variant)?;
        } else {
            tracing::debug!("skipping non-regular entry {}", path.display());
        }
    }
    Ok(())
}

fn copy_file(path: &Path, target: &Path, variant: Variant) -> Result<(), ScanError> {
    let filtered = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FILTERED_EXTENSIONS.contains(&ext));
    if !filtered {
        fs::copy(path, target).map_err(|e| io_err(target, e))?;
        return Ok(());
    }

    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    let Ok(text) = String::from_utf8(bytes) else {
        fs::copy(path, target).map_err(|e| io_err(target, e))?;
        return Ok(());
    };
    match transform(path, &text, variant)? {
        Some(out) => fs::write(target, out).map_err(|e| io_err(target, e)),
        None => {
            tracing::debug!("omitting solution file {} from stub", path.display());
            Ok(())
        }
    }
}

/// Apply the markers to one file. `None` means the file is omitted.
fn transform(path: &Path, text: &str, variant: Variant) -> Result<Option<String>, ScanError> {
    let solution_file = text.lines().any(|l| l.contains(SOLUTION_FILE));
    if solution_file && variant == Variant::Stub {
        return Ok(None);
    }

    let mut out = String::with_capacity(text.len());
    let mut open_block: Option<usize> = None;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        let lineno = idx + 1;
        let (body, ending) = split_line_ending(line);

        if body.contains(SOLUTION_FILE) {
            continue;
        }
        if body.contains(BEGIN_SOLUTION) {
            open_block = Some(lineno);
            continue;
        }
        if body.contains(END_SOLUTION) {
            if open_block.take().is_none() {
                return Err(ScanError::UnexpectedEndSolution {
                    path: path.to_path_buf(),
                    line: lineno,
                });
            }
            continue;
        }
        if let Some(caps) = stub_line().captures(body) {
            if variant == Variant::Stub && open_block.is_none() {
                out.push_str(&caps[1]);
                out.push_str(&caps[2]);
                out.push_str(ending);
            }
            continue;
        }
        if variant == Variant::Solution || open_block.is_none() {
            out.push_str(line);
        }
    }

    if let Some(line) = open_block {
        return Err(ScanError::UnterminatedSolution {
            path: path.to_path_buf(),
            line,
        });
    }
    Ok(Some(out))
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}
