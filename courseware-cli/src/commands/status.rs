//! `courseware status`: exercises, points and checksums of one course.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use courseware_core::{Course, CourseName, Exercise};
use courseware_refresh::CachePaths;

/// Arguments for `courseware status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Name of the course.
    pub course: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let settings = super::settings()?;
        let name = CourseName::from(self.course);
        let course = settings
            .store()
            .load_course(&name)
            .with_context(|| format!("failed to load course '{name}'"))?;
        let paths = CachePaths::new(&settings.cache_root, &course.name, course.cache_version);

        if self.json {
            print_json(&course, &paths)?;
            return Ok(());
        }
        print_table(&course, &paths);
        Ok(())
    }
}

#[derive(Serialize)]
struct CourseStatusJson<'a> {
    course: &'a str,
    backend: &'a str,
    url: &'a str,
    branch: &'a str,
    cache_version: u64,
    cache_dir: Option<PathBuf>,
    head_revision: Option<&'a str>,
    refreshed_at: Option<String>,
    exercises: Vec<ExerciseStatusJson<'a>>,
}

#[derive(Serialize)]
struct ExerciseStatusJson<'a> {
    name: &'a str,
    path: &'a std::path::Path,
    points: Vec<&'a str>,
    checksum: &'a str,
    archive: Option<PathBuf>,
}

#[derive(Tabled)]
struct ExerciseRow {
    #[tabled(rename = "exercise")]
    name: String,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "points")]
    points: String,
    #[tabled(rename = "checksum")]
    checksum: String,
}

fn refreshed(course: &Course) -> bool {
    course.cache_version > 0
}

fn archive_of(course: &Course, paths: &CachePaths, exercise: &Exercise) -> Option<PathBuf> {
    refreshed(course).then(|| paths.exercise_archive(exercise))
}

fn print_json(course: &Course, paths: &CachePaths) -> Result<()> {
    let payload = CourseStatusJson {
        course: &course.name.0,
        backend: &course.source.backend,
        url: &course.source.url,
        branch: &course.source.branch,
        cache_version: course.cache_version,
        cache_dir: refreshed(course).then(|| paths.version_root.clone()),
        head_revision: course.head_revision.as_deref(),
        refreshed_at: course.refreshed_at.map(|t| t.to_rfc3339()),
        exercises: course
            .exercises
            .iter()
            .map(|exercise| ExerciseStatusJson {
                name: &exercise.name.0,
                path: &exercise.path,
                points: exercise.point_names().collect(),
                checksum: &exercise.checksum,
                archive: archive_of(course, paths, exercise),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(course: &Course, paths: &CachePaths) {
    println!(
        "{} | {} {} ({}) | cache version {}",
        course.name.0.bold(),
        course.source.backend,
        course.source.url,
        course.source.branch,
        course.cache_version,
    );
    if !refreshed(course) {
        println!("{}", "Never refreshed.".bright_black());
        println!("Run: courseware refresh {}", course.name);
        return;
    }
    println!("cache: {}", paths.version_root.display());
    if let Some(revision) = &course.head_revision {
        println!("revision: {revision}");
    }

    if course.exercises.is_empty() {
        println!("No exercises found.");
        return;
    }
    let rows: Vec<ExerciseRow> = course
        .exercises
        .iter()
        .map(|exercise| ExerciseRow {
            name: exercise.name.0.clone(),
            path: exercise.path.display().to_string(),
            points: exercise.point_names().collect::<Vec<_>>().join(", "),
            checksum: short_checksum(&exercise.checksum),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn short_checksum(checksum: &str) -> String {
    if checksum.is_empty() {
        return "-".to_string();
    }
    checksum.chars().take(12).collect()
}
