//! Probe-then-patch for the generated response files.
//!
//! | File                            | Legacy global | Symptom                   |
//! |---------------------------------|---------------|---------------------------|
//! | `api/responses/serverError.js`  | `_`           | `_ is not defined`        |
//! | `api/responses/negotiate.js`    | `sails`       | `sails is not defined`    |

use std::path::{Path, PathBuf};

use treeline_core::{fsx, layout, ProjectRef};

use crate::cache::ContentCache;
use crate::error::UpgradeError;
use crate::orchestrator::UnitOutcome;
use crate::probe::{probe, Classification, LegacyGlobalDetector, ProbeContext};

// Current templates, baked into the binary at compile time.
const SERVER_ERROR_TEMPLATE: &str = include_str!("templates/serverError.js");
const NEGOTIATE_TEMPLATE: &str = include_str!("templates/negotiate.js");

/// Generated files the upgrade knows how to probe and replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratedFile {
    ServerError,
    Negotiate,
}

impl GeneratedFile {
    pub fn all() -> &'static [GeneratedFile] {
        &[GeneratedFile::ServerError, GeneratedFile::Negotiate]
    }

    pub fn relative_path(&self) -> &'static str {
        match self {
            GeneratedFile::ServerError => layout::SERVER_ERROR_RESPONSE,
            GeneratedFile::Negotiate => layout::NEGOTIATE_RESPONSE,
        }
    }

    pub fn legacy_global(&self) -> &'static str {
        match self {
            GeneratedFile::ServerError => "_",
            GeneratedFile::Negotiate => "sails",
        }
    }

    /// Known-good content shipped with this CLI.
    pub fn current_template(&self) -> &'static str {
        match self {
            GeneratedFile::ServerError => SERVER_ERROR_TEMPLATE,
            GeneratedFile::Negotiate => NEGOTIATE_TEMPLATE,
        }
    }

    pub fn detector(&self) -> LegacyGlobalDetector {
        LegacyGlobalDetector::new(self.relative_path(), self.legacy_global())
    }
}

/// Overwrite `file` under `root` with the bundled template and drop any
/// cached copy so the next probe reads the new content.
pub fn patch_file(
    root: &Path,
    file: GeneratedFile,
    cache: &ContentCache,
) -> Result<PathBuf, UpgradeError> {
    let target = root.join(file.relative_path());
    fsx::write_atomic(&target, file.current_template().as_bytes())?;
    cache.invalidate(&target);
    tracing::info!("patched: {}", target.display());
    Ok(target)
}

/// Probe one generated file and patch it when it is a legacy template.
///
/// Machinepack projects never had these files; they are skipped without
/// touching the filesystem.
pub fn probe_and_patch(
    project: &ProjectRef,
    file: GeneratedFile,
    cache: &ContentCache,
    ctx: &ProbeContext,
) -> Result<UnitOutcome, UpgradeError> {
    if !project.is_app() {
        return Ok(UnitOutcome::skipped("not an app project"));
    }

    match probe(&project.root, &file.detector(), cache, ctx) {
        Classification::Current => Ok(UnitOutcome::skipped(format!(
            "{} is current",
            file.relative_path()
        ))),
        Classification::Indeterminate { reason } => {
            tracing::debug!("leaving {} alone: {reason}", file.relative_path());
            Ok(UnitOutcome::skipped(reason))
        }
        Classification::NeedsPatch => {
            let target = patch_file(&project.root, file, cache)?;
            Ok(UnitOutcome::done(format!(
                "replaced legacy {} ({} is not defined)",
                relative_display(&target, &project.root),
                file.legacy_global()
            )))
        }
    }
}

fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use treeline_core::ProjectType;

    const LEGACY_SERVER_ERROR: &str = "module.exports = function serverError (data) {\n\
        var res = this.res;\n\
        if (_.isUndefined(data)) { return res.send(500); }\n\
        return res.send(500, data);\n\
    };\n";

    fn app_with(file: GeneratedFile, content: &str) -> (TempDir, ProjectRef) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(file.relative_path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        let project = ProjectRef::new(tmp.path(), ProjectType::App);
        (tmp, project)
    }

    #[test]
    fn bundled_templates_classify_as_current() {
        let ctx = ProbeContext::synthetic();
        for file in GeneratedFile::all() {
            let verdict = crate::probe::StalenessDetector::classify(
                &file.detector(),
                file.current_template(),
                &ctx,
            );
            assert_eq!(verdict, Classification::Current, "{file:?} template is stale");
        }
    }

    #[test]
    fn legacy_file_is_patched_once_and_cache_invalidated() {
        let (_tmp, project) = app_with(GeneratedFile::ServerError, LEGACY_SERVER_ERROR);
        let cache = ContentCache::new();
        let ctx = ProbeContext::synthetic();
        let target = project.path(GeneratedFile::ServerError.relative_path());

        let outcome = probe_and_patch(&project, GeneratedFile::ServerError, &cache, &ctx).unwrap();
        assert!(matches!(outcome, UnitOutcome::Done { .. }), "got {outcome:?}");
        assert!(!cache.contains(&target), "patched path must be evicted");
        assert_eq!(fs::read_to_string(&target).unwrap(), SERVER_ERROR_TEMPLATE);

        // Same cache, same run: the second probe must see the patched content.
        let again = probe_and_patch(&project, GeneratedFile::ServerError, &cache, &ctx).unwrap();
        assert!(matches!(again, UnitOutcome::Skipped { .. }), "got {again:?}");
    }

    #[test]
    fn other_failure_modes_are_not_patched() {
        let customized = "module.exports = function (data) { return customLogger.fail(data); };\n";
        let (_tmp, project) = app_with(GeneratedFile::ServerError, customized);
        let outcome = probe_and_patch(
            &project,
            GeneratedFile::ServerError,
            &ContentCache::new(),
            &ProbeContext::synthetic(),
        )
        .unwrap();
        assert!(matches!(outcome, UnitOutcome::Skipped { .. }));
        let on_disk = fs::read_to_string(project.path(GeneratedFile::ServerError.relative_path()));
        assert_eq!(on_disk.unwrap(), customized);
    }

    #[test]
    fn missing_file_is_skipped_and_not_created() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRef::new(tmp.path(), ProjectType::App);
        let outcome = probe_and_patch(
            &project,
            GeneratedFile::Negotiate,
            &ContentCache::new(),
            &ProbeContext::synthetic(),
        )
        .unwrap();
        assert!(matches!(outcome, UnitOutcome::Skipped { .. }));
        assert!(!project.path(GeneratedFile::Negotiate.relative_path()).exists());
    }

    #[test]
    fn legacy_negotiate_reading_sails_global_is_patched() {
        let legacy = "module.exports = function negotiate (err) {\n\
            sails.log.verbose('negotiating');\n\
            return this.res.serverError(err);\n\
        };\n";
        let (_tmp, project) = app_with(GeneratedFile::Negotiate, legacy);
        let outcome = probe_and_patch(
            &project,
            GeneratedFile::Negotiate,
            &ContentCache::new(),
            &ProbeContext::synthetic(),
        )
        .unwrap();
        assert!(matches!(outcome, UnitOutcome::Done { .. }));
        assert_eq!(
            fs::read_to_string(project.path(GeneratedFile::Negotiate.relative_path())).unwrap(),
            NEGOTIATE_TEMPLATE
        );
    }

    #[test]
    fn machinepack_projects_are_skipped() {
        let (_tmp, mut project) = app_with(GeneratedFile::ServerError, LEGACY_SERVER_ERROR);
        project.project_type = ProjectType::Machinepack;
        let cache = ContentCache::new();
        let outcome =
            probe_and_patch(&project, GeneratedFile::ServerError, &cache, &ProbeContext::synthetic())
                .unwrap();
        assert_eq!(outcome, UnitOutcome::skipped("not an app project"));
        assert!(cache.is_empty(), "machinepack probe must not read files");
    }
}
