//! `treeline upgrade`: best-effort remediation of a generated project.
//!
//! Always exits 0 once every unit has run; failures show up in the report.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use treeline_core::{ProjectRef, Settings};
use treeline_remote::HttpLinker;
use treeline_upgrade::{LinkSettings, UnitOutcome, UpgradeReport, Upgrader};

use crate::ProjectTypeArg;

/// Arguments for `treeline upgrade`.
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Project directory (defaults to the current directory).
    pub dir: Option<PathBuf>,

    /// Kind of project: app or machinepack.
    #[arg(long = "type", value_name = "TYPE", default_value = "app")]
    pub project_type: ProjectTypeArg,

    /// Treeline API base URL [env: TREELINE_API_URL].
    #[arg(long)]
    pub api_url: Option<String>,

    /// Credential file [env: TREELINE_KEYCHAIN].
    #[arg(long)]
    pub keychain: Option<PathBuf>,

    /// Emit the upgrade report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl UpgradeArgs {
    pub fn run(self) -> Result<ExitCode> {
        let root = match self.dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("could not determine current directory")?,
        };
        let settings = Settings::resolve(self.api_url, self.keychain)
            .context("failed to resolve settings")?;
        let project = ProjectRef::new(root, self.project_type.into());

        let upgrader = Upgrader::new(
            Arc::new(HttpLinker::new()),
            LinkSettings {
                api_base_url: settings.api_base_url,
                credentials_path: settings.keychain_path,
            },
        );
        let report = upgrader
            .run_blocking(&project)
            .context("upgrade could not start")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(report: &UpgradeReport) {
    println!(
        "{} {} project at {}",
        "Upgrading".bold(),
        report.project_type,
        report.project.display()
    );
    for unit in &report.units {
        let (marker, message) = match &unit.outcome {
            UnitOutcome::Done { detail } => ("✓".green().bold(), detail.normal()),
            UnitOutcome::Skipped { reason } => ("·".bright_black(), reason.bright_black()),
            UnitOutcome::Failed { reason } => ("!".yellow().bold(), reason.yellow()),
        };
        println!("  {marker} {:<24} {message}", unit.unit.as_str());
    }

    let failed = report.failures().count();
    let summary = format!(
        "{} changed, {} failed ({})",
        report.changed(),
        failed,
        report.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if failed > 0 {
        println!("{}", summary.yellow());
    } else {
        println!("{}", summary.green());
    }
}
