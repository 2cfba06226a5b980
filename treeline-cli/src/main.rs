//! Treeline: keep generated projects current and export machinepacks.
//!
//! # Usage
//!
//! ```text
//! treeline upgrade [DIR] [--type app|machinepack] [--api-url URL] [--keychain PATH] [--json]
//! treeline export [--id ID] [--dest PATH] [--force] [--api-url URL] [--keychain PATH]
//! ```

mod commands;
mod prompt;

use std::fmt;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{export::ExportArgs, upgrade::UpgradeArgs};
use treeline_core::ProjectType;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "treeline",
    version,
    about = "Upgrade generated projects and export machinepacks",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Patch stale generated files and remove legacy scaffolding.
    Upgrade(UpgradeArgs),

    /// Export a machinepack and its dependencies to a local folder.
    Export(ExportArgs),
}

// ---------------------------------------------------------------------------
// Shared ProjectType argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `ProjectType` from CLI args.
#[derive(Debug, Clone, Default)]
pub struct ProjectTypeArg(pub ProjectType);

impl FromStr for ProjectTypeArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "app" => Ok(Self(ProjectType::App)),
            "machinepack" => Ok(Self(ProjectType::Machinepack)),
            other => Err(format!(
                "unknown project type '{other}'; expected: app, machinepack"
            )),
        }
    }
}

impl fmt::Display for ProjectTypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<ProjectTypeArg> for ProjectType {
    fn from(p: ProjectTypeArg) -> Self {
        p.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Upgrade(args) => args.run(),
        Commands::Export(args) => args.run(),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays clean for `--json`.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
