//! Per-exercise downloadable archives.
//!
//! Each archive is a gzip-compressed tar holding the exercise's stub entries
//! under `<exercise path>/…`, in stub enumeration order. Headers carry no
//! timestamps or ownership so identical stub trees produce identical bytes.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{EntryType, Header};

use courseware_core::Exercise;

use crate::checksum::StubEntry;
use crate::error::{io_err, RefreshError};

/// Write `entries` (from [`crate::checksum::stub_entries`]) to `archive`.
pub fn write_archive(
    exercise: &Exercise,
    entries: &[StubEntry],
    archive: &Path,
) -> Result<(), RefreshError> {
    if let Some(parent) = archive.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let file = File::create(archive).map_err(|e| io_err(archive, e))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    let prefix = archive_prefix(exercise);
    for entry in entries {
        let name = format!("{prefix}/{}", entry.rel);
        let mut header = Header::new_gnu();
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        if entry.is_dir {
            header.set_entry_type(EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            builder
                .append_data(&mut header, &name, std::io::empty())
                .map_err(|e| io_err(archive, e))?;
        } else {
            let file = File::open(&entry.path).map_err(|e| io_err(&entry.path, e))?;
            let len = file.metadata().map_err(|e| io_err(&entry.path, e))?.len();
            header.set_entry_type(EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(len);
            builder
                .append_data(&mut header, &name, file)
                .map_err(|e| io_err(archive, e))?;
        }
    }

    let encoder = builder.into_inner().map_err(|e| io_err(archive, e))?;
    let mut writer = encoder.finish().map_err(|e| io_err(archive, e))?;
    std::io::Write::flush(&mut writer).map_err(|e| io_err(archive, e))?;
    tracing::debug!("packaged {} entries into {}", entries.len(), archive.display());
    Ok(())
}

/// The exercise path with `/` separators, as stored inside the archive.
fn archive_prefix(exercise: &Exercise) -> String {
    exercise
        .path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::stub_entries;
    use courseware_core::ExerciseName;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn stub_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/pkg")).unwrap();
        fs::create_dir_all(dir.path().join("test")).unwrap();
        fs::write(dir.path().join("src/pkg/Main.java"), "class Main {}\n").unwrap();
        fs::write(dir.path().join("test/MainTest.java"), "class MainTest {}\n").unwrap();
        dir
    }

    fn read_archive(path: &Path) -> Vec<(String, bool, Vec<u8>)> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut e = e.unwrap();
                let name = e.path().unwrap().to_string_lossy().trim_end_matches('/').to_string();
                let is_dir = e.header().entry_type().is_dir();
                assert_eq!(e.header().mtime().unwrap(), 0);
                let mut bytes = Vec::new();
                e.read_to_end(&mut bytes).unwrap();
                (name, is_dir, bytes)
            })
            .collect()
    }

    #[test]
    fn archive_mirrors_enumeration_under_exercise_path() {
        let stub = stub_tree();
        let out = TempDir::new().unwrap();
        let archive = out.path().join("archives").join("loops-ForLoop.tar.gz");
        let exercise = Exercise::new(
            ExerciseName::from("loops-ForLoop"),
            PathBuf::from("loops/ForLoop"),
        );

        let entries = stub_entries(stub.path()).unwrap();
        write_archive(&exercise, &entries, &archive).expect("archive");

        let contents = read_archive(&archive);
        let names: Vec<_> = contents.iter().map(|(n, _, _)| n.clone()).collect();
        let expected: Vec<_> = entries
            .iter()
            .map(|e| format!("loops/ForLoop/{}", e.rel))
            .collect();
        assert_eq!(names, expected);
        for ((_, is_dir, bytes), entry) in contents.iter().zip(&entries) {
            assert_eq!(*is_dir, entry.is_dir);
            if !entry.is_dir {
                assert_eq!(bytes, &fs::read(&entry.path).unwrap());
            }
        }
    }

    #[test]
    fn identical_trees_produce_identical_archives() {
        let a = stub_tree();
        let b = stub_tree();
        let out = TempDir::new().unwrap();
        let exercise = Exercise::new(ExerciseName::from("e"), PathBuf::from("e"));
        let first = out.path().join("a.tar.gz");
        let second = out.path().join("b.tar.gz");
        write_archive(&exercise, &stub_entries(a.path()).unwrap(), &first).unwrap();
        write_archive(&exercise, &stub_entries(b.path()).unwrap(), &second).unwrap();
        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }
}
