//! `treeline export`: write a machinepack and its dependencies locally.
//!
//! | Outcome           | Exit code |
//! |-------------------|-----------|
//! | success           | 0         |
//! | any other error   | 1         |
//! | not logged in     | 2         |
//! | already exists    | 3         |
//! | not implemented   | 4         |

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use treeline_core::{PackId, Settings};
use treeline_export::{export_blocking, ExportEnv, ExportError, ExportReport, ExportRequest};
use treeline_remote::HttpApi;

use crate::prompt::TerminalSelector;

/// Arguments for `treeline export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Identity of the pack to export (not supported yet; omit to pick from a list).
    #[arg(long)]
    pub id: Option<String>,

    /// Output folder (defaults to ./<pack id>).
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Overwrite files in an existing output folder.
    #[arg(long)]
    pub force: bool,

    /// Treeline API base URL [env: TREELINE_API_URL].
    #[arg(long)]
    pub api_url: Option<String>,

    /// Credential file [env: TREELINE_KEYCHAIN].
    #[arg(long)]
    pub keychain: Option<PathBuf>,
}

impl ExportArgs {
    pub fn run(self) -> Result<ExitCode> {
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        let settings = Settings::resolve(self.api_url, self.keychain)
            .context("failed to resolve settings")?;

        let request = ExportRequest {
            identity: self.id.map(PackId::from),
            destination: self.dest,
            force: self.force,
            cwd,
        };
        let env = ExportEnv {
            api: Arc::new(HttpApi::new(settings.api_base_url)),
            selector: Arc::new(TerminalSelector),
            keychain_path: settings.keychain_path,
        };

        match export_blocking(request, env) {
            Ok(report) => {
                print_report(&report);
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => match exit_code(&err) {
                Some(code) => {
                    eprintln!("{} {err}", "error:".red().bold());
                    Ok(ExitCode::from(code))
                }
                None => Err(anyhow::Error::new(err).context("export failed")),
            },
        }
    }
}

/// Dedicated exit codes for the outcomes scripts care about.
fn exit_code(err: &ExportError) -> Option<u8> {
    match err {
        ExportError::NotLoggedIn { .. } => Some(2),
        ExportError::AlreadyExists { .. } => Some(3),
        ExportError::NotImplemented => Some(4),
        _ => None,
    }
}

#[derive(Tabled)]
struct FolderRow {
    #[tabled(rename = "pack")]
    pack: String,
    #[tabled(rename = "role")]
    role: &'static str,
    #[tabled(rename = "folder")]
    folder: String,
}

fn print_report(report: &ExportReport) {
    println!(
        "{} exported {} ({})",
        "✓".green().bold(),
        report.pack.display_name.bold(),
        report.pack.id
    );

    let mut rows = vec![FolderRow {
        pack: report.pack.id.to_string(),
        role: "main",
        folder: report.main.display().to_string(),
    }];
    rows.extend(report.dependencies.iter().map(|dir| FolderRow {
        pack: dir
            .strip_prefix(report.main.join("node_modules"))
            .unwrap_or(dir)
            .display()
            .to_string(),
        role: "dependency",
        folder: dir.display().to_string(),
    }));

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_outcomes_have_dedicated_codes() {
        assert_eq!(
            exit_code(&ExportError::NotLoggedIn {
                path: PathBuf::from("/h/.treeline.secret.json")
            }),
            Some(2)
        );
        assert_eq!(
            exit_code(&ExportError::AlreadyExists {
                path: PathBuf::from("out")
            }),
            Some(3)
        );
        assert_eq!(exit_code(&ExportError::NotImplemented), Some(4));
        assert_eq!(exit_code(&ExportError::NoPacks), None);
    }
}
