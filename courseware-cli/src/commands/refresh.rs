//! `courseware refresh`: rebuild a course's cache version.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use courseware_core::CourseName;
use courseware_refresh::{Refresher, Report};

/// Arguments for `courseware refresh`.
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Name of the course to refresh.
    pub course: String,
}

impl RefreshArgs {
    pub fn run(self) -> Result<()> {
        let settings = super::settings()?;
        let refresher = Refresher::from_settings(&settings);
        let name = CourseName::from(self.course);
        let mut course = refresher
            .store()
            .load_course(&name)
            .with_context(|| format!("failed to load course '{name}'"))?;

        match refresher.refresh_course(&mut course) {
            Ok(report) => {
                print_report(&report);
                println!(
                    "✓ '{}' refreshed to cache version {} ({} exercises)",
                    course.name,
                    course.cache_version,
                    course.exercises.len()
                );
                Ok(())
            }
            Err(failure) => {
                print_report(&failure.report);
                bail!(
                    "refresh of '{}' failed; cache version {} is unchanged",
                    course.name,
                    course.cache_version
                )
            }
        }
    }
}

fn print_report(report: &Report) {
    for warning in &report.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
    for error in &report.errors {
        eprintln!("{} {error}", "error:".red().bold());
    }
}
