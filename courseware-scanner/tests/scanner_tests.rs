//! Tree-level tests for the default collaborators.
//!
//! Each `#[case]` gets an isolated `TempDir`: no shared state.

use std::fs;
use std::path::Path;

use courseware_scanner::{
    detect_layout, AnnotationScanner, ExerciseLayout, FileFilter, MarkerFilter, PointScanner,
};
use rstest::rstest;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_dir() -> TempDir {
    TempDir::new().expect("tempdir")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write fixture");
}

fn mkdir(root: &Path, rel: &str) {
    fs::create_dir_all(root.join(rel)).expect("mkdir");
}

fn listing(root: &Path) -> Vec<String> {
    let mut out: Vec<String> = collect_entries(root, root);
    out.sort();
    out
}

fn collect_entries(root: &Path, dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).expect("read_dir") {
        let entry = entry.expect("entry");
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
        if path.is_dir() {
            out.push(format!("{rel}/"));
            out.extend(collect_entries(root, &path));
        } else {
            out.push(rel);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Layout detection
// ---------------------------------------------------------------------------

#[rstest]
#[case(&["pom.xml"], &["src"], ExerciseLayout::Maven)]
#[case(&["build.gradle"], &["src"], ExerciseLayout::Gradle)]
#[case(&["build.gradle.kts"], &["src"], ExerciseLayout::Gradle)]
#[case(&["build.xml"], &["src", "test"], ExerciseLayout::Ant)]
#[case(&["setup.py"], &["src", "test"], ExerciseLayout::Python)]
#[case(&[], &["src", "test", "tmc"], ExerciseLayout::Python)]
#[case(&["Makefile"], &["src", "test"], ExerciseLayout::Make)]
#[case(&[], &["src", "test"], ExerciseLayout::Plain)]
fn layout_detection(
    #[case] files: &[&str],
    #[case] dirs: &[&str],
    #[case] expected: ExerciseLayout,
) {
    let dir = make_dir();
    for f in files {
        write(dir.path(), f, "");
    }
    for d in dirs {
        mkdir(dir.path(), d);
    }
    assert_eq!(detect_layout(dir.path()).expect("detect"), Some(expected));
}

#[rstest]
#[case(&[], &[])]
#[case(&["build.xml"], &["src"])]
#[case(&[], &["test"])]
#[case(&["README.md"], &["docs"])]
fn not_an_exercise(#[case] files: &[&str], #[case] dirs: &[&str]) {
    let dir = make_dir();
    for f in files {
        write(dir.path(), f, "");
    }
    for d in dirs {
        mkdir(dir.path(), d);
    }
    assert_eq!(detect_layout(dir.path()).expect("detect"), None);
}

// ---------------------------------------------------------------------------
// Point scanning
// ---------------------------------------------------------------------------

#[test]
fn scanner_collects_points_across_test_files() {
    let dir = make_dir();
    write(dir.path(), "test/ATest.java", "@Points(\"1.1\")\nclass ATest {}\n");
    write(dir.path(), "test/BTest.java", "@Points(\"1.2 1.1\")\nclass BTest {}\n");
    write(dir.path(), "test/test_c.py", "@points('1.3')\ndef test(): pass\n");
    write(dir.path(), "README.md", "@Points(\"ignored\")\n");
    write(dir.path(), ".hidden/Skip.java", "@Points(\"hidden\")\n");

    let names = AnnotationScanner.scan_point_names(dir.path()).expect("scan");
    let names: Vec<_> = names.into_iter().collect();
    assert_eq!(names, vec!["1.1", "1.2", "1.3"]);
}

#[test]
fn scanner_on_exercise_without_tests_is_empty() {
    let dir = make_dir();
    write(dir.path(), "src/Main.java", "class Main {}\n");
    assert!(AnnotationScanner.scan_point_names(dir.path()).expect("scan").is_empty());
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

fn exercise_fixture(root: &Path) {
    write(
        root,
        "src/Sum.java",
        "class Sum {\n  int sum(int a, int b) {\n    // BEGIN SOLUTION\n    return a + b;\n    // END SOLUTION\n    // STUB: return 0;\n  }\n}\n",
    );
    write(root, "src/Helper.java", "// SOLUTION FILE\nclass Helper {}\n");
    write(root, "test/SumTest.java", "@Points(\"1.1\")\nclass SumTest {}\n");
    write(root, "lib/data.bin", "\u{0}\u{1}\u{2}");
    write(root, ".git/HEAD", "ref: refs/heads/main\n");
    mkdir(root, "resources");
}

#[test]
fn stub_tree_omits_solution_files_and_hidden_entries() {
    let src = make_dir();
    let dst = make_dir();
    exercise_fixture(src.path());
    let stub = dst.path().join("stub");

    MarkerFilter.make_stub(src.path(), &stub).expect("stub");

    assert_eq!(
        listing(&stub),
        vec![
            "lib/",
            "lib/data.bin",
            "resources/",
            "src/",
            "src/Sum.java",
            "test/",
            "test/SumTest.java",
        ]
    );
    let sum = fs::read_to_string(stub.join("src/Sum.java")).expect("read");
    assert!(sum.contains("    return 0;"));
    assert!(!sum.contains("a + b"));
    assert_eq!(fs::read(stub.join("lib/data.bin")).expect("read"), vec![0, 1, 2]);
}

#[test]
fn solution_tree_keeps_solution_files() {
    let src = make_dir();
    let dst = make_dir();
    exercise_fixture(src.path());
    let solution = dst.path().join("solution");

    MarkerFilter.make_solution(src.path(), &solution).expect("solution");

    let files = listing(&solution);
    assert!(files.contains(&"src/Helper.java".to_string()));
    assert!(!files.iter().any(|f| f.starts_with(".git")));
    let sum = fs::read_to_string(solution.join("src/Sum.java")).expect("read");
    assert!(sum.contains("return a + b;"));
    assert!(!sum.contains("return 0;"));
    let helper = fs::read_to_string(solution.join("src/Helper.java")).expect("read");
    assert_eq!(helper, "class Helper {}\n");
}
