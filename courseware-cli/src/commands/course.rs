//! `courseware course add <name>` and `courseware course list`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use courseware_core::{Course, CourseName, SourceLocation};

/// Manage registered courses.
#[derive(Subcommand, Debug)]
pub enum CourseCommand {
    /// List all registered courses.
    List,

    /// Register a new course.
    Add(AddArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Course name (e.g. "java-intro").
    pub name: String,

    /// Repository URL or local path.
    #[arg(long)]
    pub url: String,

    /// Branch to check out.
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Source backend. Only `git` can be refreshed.
    #[arg(long, default_value = "git")]
    pub backend: String,
}

#[derive(Tabled)]
struct CourseRow {
    #[tabled(rename = "course")]
    name: String,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "version")]
    version: u64,
    #[tabled(rename = "exercises")]
    exercises: usize,
    #[tabled(rename = "last refresh")]
    refreshed: String,
}

pub fn run(cmd: CourseCommand) -> Result<()> {
    match cmd {
        CourseCommand::List => list(),
        CourseCommand::Add(args) => add(args),
    }
}

fn list() -> Result<()> {
    let store = super::settings()?.store();
    let courses = store.list_courses().context("failed to read course store")?;

    if courses.is_empty() {
        println!("No courses registered.");
        println!("Run: courseware course add <name> --url <repository>");
        return Ok(());
    }

    let rows: Vec<CourseRow> = courses
        .into_iter()
        .map(|course| CourseRow {
            source: format!(
                "{} {} ({})",
                course.source.backend, course.source.url, course.source.branch
            ),
            version: course.cache_version,
            exercises: course.exercises.len(),
            refreshed: course
                .refreshed_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string()),
            name: course.name.0,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn add(args: AddArgs) -> Result<()> {
    let store = super::settings()?.store();
    let source = SourceLocation {
        backend: args.backend,
        url: args.url,
        branch: args.branch,
    };
    let course = store
        .create_course(Course::new(CourseName::from(args.name.clone()), source))
        .with_context(|| format!("failed to add course '{}'", args.name))?;

    println!("✓ Added course '{}'", course.name);
    println!("Run: courseware refresh {}", course.name);
    Ok(())
}
