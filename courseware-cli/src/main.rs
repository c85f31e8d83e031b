//! Courseware: course refresh CLI.
//!
//! # Usage
//!
//! ```text
//! courseware course add <name> --url <url> [--branch main] [--backend git]
//! courseware course list
//! courseware refresh <course>
//! courseware status <course> [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{course::CourseCommand, refresh::RefreshArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "courseware",
    version,
    about = "Refresh programming courses into a versioned local cache",
    long_about = None,
)]
struct Cli {
    /// Log more (-v info, -vv debug). `RUST_LOG` applies when not given.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register and list courses.
    Course {
        #[command(subcommand)]
        command: CourseCommand,
    },

    /// Rebuild a course's cache from its source repository.
    Refresh(RefreshArgs),

    /// Show a course's exercises, points and checksums.
    Status(StatusArgs),
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.format_timestamp(None).init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Course { command } => commands::course::run(command),
        Commands::Refresh(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
