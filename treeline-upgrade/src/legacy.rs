//! Removal of scaffolding older CLIs generated and the current one no longer
//! uses. The three removals are independent of each other.

use serde_json::Value;

use treeline_core::{
    fsx::{self, Existence, Removal},
    layout, ProjectRef,
};

use crate::error::UpgradeError;
use crate::orchestrator::UnitOutcome;

/// Delete `api/machines/` (app projects only).
pub fn remove_legacy_machines_dir(project: &ProjectRef) -> Result<UnitOutcome, UpgradeError> {
    if !project.is_app() {
        return Ok(UnitOutcome::skipped("not an app project"));
    }
    let dir = layout::legacy_machines_dir(&project.root);
    match fsx::remove_path(&dir)? {
        Removal::Removed => {
            tracing::info!("removed: {}", dir.display());
            Ok(UnitOutcome::done(format!("removed {}", layout::LEGACY_MACHINES_DIR)))
        }
        Removal::Absent => Ok(UnitOutcome::skipped(format!(
            "{} not present",
            layout::LEGACY_MACHINES_DIR
        ))),
    }
}

/// Delete the installed `sails-hook-machines` module (app projects only).
///
/// The manifest entry is dropped first; if rewriting `package.json` fails the
/// module folder is left in place so the manifest never names a missing module.
pub fn remove_legacy_hook(project: &ProjectRef) -> Result<UnitOutcome, UpgradeError> {
    if !project.is_app() {
        return Ok(UnitOutcome::skipped("not an app project"));
    }
    let hook_dir = layout::legacy_hook_dir(&project.root);
    if fsx::exists(&hook_dir)? == Existence::DoesNotExist {
        return Ok(UnitOutcome::skipped(format!(
            "{} not installed",
            layout::LEGACY_HOOK_DEPENDENCY
        )));
    }

    let manifest_updated = drop_legacy_dependency(project)?;
    fsx::remove_path(&hook_dir)?;
    tracing::info!("removed: {}", hook_dir.display());

    let detail = if manifest_updated {
        format!(
            "removed {} and its package.json dependency",
            layout::LEGACY_HOOK_DEPENDENCY
        )
    } else {
        format!("removed {}", layout::LEGACY_HOOK_DEPENDENCY)
    };
    Ok(UnitOutcome::done(detail))
}

/// Delete `node_modules/postinstall.js` (every project type).
pub fn remove_postinstall_script(project: &ProjectRef) -> Result<UnitOutcome, UpgradeError> {
    let script = layout::legacy_postinstall_path(&project.root);
    match fsx::remove_path(&script)? {
        Removal::Removed => {
            tracing::info!("removed: {}", script.display());
            Ok(UnitOutcome::done("removed legacy postinstall script"))
        }
        Removal::Absent => Ok(UnitOutcome::skipped("no legacy postinstall script")),
    }
}

/// Remove `dependencies["sails-hook-machines"]` from `package.json`.
///
/// Returns `true` only when the manifest was rewritten. A manifest without
/// the entry (or without a manifest at all) is never touched.
fn drop_legacy_dependency(project: &ProjectRef) -> Result<bool, UpgradeError> {
    let manifest = layout::manifest_path(&project.root);
    if fsx::exists(&manifest)? == Existence::DoesNotExist {
        return Ok(false);
    }

    let mut doc: Value = fsx::read_json(&manifest)?;
    let removed = doc
        .get_mut("dependencies")
        .and_then(Value::as_object_mut)
        .and_then(|deps| deps.shift_remove(layout::LEGACY_HOOK_DEPENDENCY))
        .is_some();
    if !removed {
        return Ok(false);
    }

    fsx::write_json(&manifest, &doc, true)?;
    tracing::info!(
        "dropped {} from {}",
        layout::LEGACY_HOOK_DEPENDENCY,
        manifest.display()
    );
    Ok(true)
}
