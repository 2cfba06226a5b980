//! Runs every upgrade unit concurrently and folds their results into one
//! report. A unit that fails or panics is logged and recorded; it never stops
//! the others and never fails the run.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinError;

use treeline_core::{ProjectLinker, ProjectRef, ProjectType};

use crate::cache::ContentCache;
use crate::error::UpgradeError;
use crate::legacy;
use crate::link::{migrate_link, LinkSettings};
use crate::patch::{probe_and_patch, GeneratedFile};
use crate::probe::ProbeContext;

/// One independent remediation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    PatchServerError,
    PatchNegotiate,
    RemoveLegacyMachines,
    RemoveLegacyHook,
    RemovePostinstall,
    MigrateLink,
}

impl UnitKind {
    pub fn all() -> &'static [UnitKind] {
        &[
            UnitKind::PatchServerError,
            UnitKind::PatchNegotiate,
            UnitKind::RemoveLegacyMachines,
            UnitKind::RemoveLegacyHook,
            UnitKind::RemovePostinstall,
            UnitKind::MigrateLink,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::PatchServerError => "patch-server-error",
            UnitKind::PatchNegotiate => "patch-negotiate",
            UnitKind::RemoveLegacyMachines => "remove-legacy-machines",
            UnitKind::RemoveLegacyHook => "remove-legacy-hook",
            UnitKind::RemovePostinstall => "remove-postinstall",
            UnitKind::MigrateLink => "migrate-link",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a unit did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UnitOutcome {
    /// The unit changed something on disk (or remotely re-linked).
    Done { detail: String },
    /// Nothing to do.
    Skipped { reason: String },
    /// The unit failed; the failure was logged and swallowed.
    Failed { reason: String },
}

impl UnitOutcome {
    pub fn done(detail: impl Into<String>) -> Self {
        UnitOutcome::Done {
            detail: detail.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        UnitOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        UnitOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, UnitOutcome::Done { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, UnitOutcome::Failed { .. })
    }

    /// Human-readable detail, whatever the status.
    pub fn message(&self) -> &str {
        match self {
            UnitOutcome::Done { detail } => detail,
            UnitOutcome::Skipped { reason } | UnitOutcome::Failed { reason } => reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    pub unit: UnitKind,
    #[serde(flatten)]
    pub outcome: UnitOutcome,
}

/// Result of one `upgrade` run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeReport {
    pub project: PathBuf,
    pub project_type: ProjectType,
    pub units: Vec<UnitReport>,
    pub completed_at: DateTime<Utc>,
}

impl UpgradeReport {
    pub fn outcome(&self, unit: UnitKind) -> Option<&UnitOutcome> {
        self.units
            .iter()
            .find(|report| report.unit == unit)
            .map(|report| &report.outcome)
    }

    pub fn changed(&self) -> usize {
        self.units.iter().filter(|r| r.outcome.is_done()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|r| r.outcome.is_failed())
    }
}

/// Upgrade driver. Cheap to clone; every unit gets its own handle to the
/// shared cache, probe context, and linker.
#[derive(Clone)]
pub struct Upgrader {
    linker: Arc<dyn ProjectLinker>,
    link: LinkSettings,
    cache: Arc<ContentCache>,
    probe_ctx: Arc<ProbeContext>,
}

impl Upgrader {
    pub fn new(linker: Arc<dyn ProjectLinker>, link: LinkSettings) -> Self {
        Self {
            linker,
            link,
            cache: Arc::new(ContentCache::new()),
            probe_ctx: Arc::new(ProbeContext::synthetic()),
        }
    }

    pub fn with_probe_context(mut self, ctx: ProbeContext) -> Self {
        self.probe_ctx = Arc::new(ctx);
        self
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Build a runtime and run the upgrade to completion on it.
    pub fn run_blocking(&self, project: &ProjectRef) -> Result<UpgradeReport, UpgradeError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(UpgradeError::Runtime)?;
        Ok(runtime.block_on(self.run(project)))
    }

    /// Run all units concurrently and wait for every one of them.
    pub async fn run(&self, project: &ProjectRef) -> UpgradeReport {
        // Files from an earlier run may have changed on disk since.
        self.cache.clear();
        tracing::info!(
            "upgrading {} project at {}",
            project.project_type,
            project.root.display()
        );

        let server_error = self.spawn_patch(project, GeneratedFile::ServerError);
        let negotiate = self.spawn_patch(project, GeneratedFile::Negotiate);
        let machines = spawn_unit(project, legacy::remove_legacy_machines_dir);
        let hook = spawn_unit(project, legacy::remove_legacy_hook);
        let postinstall = spawn_unit(project, legacy::remove_postinstall_script);
        let link = {
            let project = project.clone();
            let linker = Arc::clone(&self.linker);
            let settings = self.link.clone();
            tokio::task::spawn_blocking(move || migrate_link(&project, linker.as_ref(), &settings))
        };

        let (server_error, negotiate, machines, hook, postinstall, link) =
            tokio::join!(server_error, negotiate, machines, hook, postinstall, link);

        let units = vec![
            settle(UnitKind::PatchServerError, server_error),
            settle(UnitKind::PatchNegotiate, negotiate),
            settle(UnitKind::RemoveLegacyMachines, machines),
            settle(UnitKind::RemoveLegacyHook, hook),
            settle(UnitKind::RemovePostinstall, postinstall),
            settle(UnitKind::MigrateLink, link),
        ];

        UpgradeReport {
            project: project.root.clone(),
            project_type: project.project_type,
            units,
            completed_at: Utc::now(),
        }
    }

    fn spawn_patch(
        &self,
        project: &ProjectRef,
        file: GeneratedFile,
    ) -> tokio::task::JoinHandle<Result<UnitOutcome, UpgradeError>> {
        let project = project.clone();
        let cache = Arc::clone(&self.cache);
        let ctx = Arc::clone(&self.probe_ctx);
        tokio::task::spawn_blocking(move || probe_and_patch(&project, file, &cache, &ctx))
    }
}

fn spawn_unit(
    project: &ProjectRef,
    unit: fn(&ProjectRef) -> Result<UnitOutcome, UpgradeError>,
) -> tokio::task::JoinHandle<Result<UnitOutcome, UpgradeError>> {
    let project = project.clone();
    tokio::task::spawn_blocking(move || unit(&project))
}

fn settle(
    unit: UnitKind,
    result: Result<Result<UnitOutcome, UpgradeError>, JoinError>,
) -> UnitReport {
    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            tracing::warn!("{unit} failed: {err}");
            UnitOutcome::failed(err.to_string())
        }
        Err(err) => {
            tracing::warn!("{unit} task join failure: {err}");
            UnitOutcome::failed(format!("task join failure: {err}"))
        }
    };
    UnitReport { unit, outcome }
}
