//! Migration of legacy link metadata (`treeline.json` carrying `fullName`).

use std::path::PathBuf;

use serde_json::Value;

use treeline_core::{fsx, layout, LinkRequest, ProjectLinker, ProjectRef};

use crate::error::UpgradeError;
use crate::orchestrator::UnitOutcome;

/// Remote endpoint and credential location handed to the linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub api_base_url: String,
    pub credentials_path: PathBuf,
}

/// Re-link a project whose `treeline.json` still uses the legacy schema.
///
/// A missing or unreadable link file means there is nothing to migrate.
pub fn migrate_link(
    project: &ProjectRef,
    linker: &dyn ProjectLinker,
    settings: &LinkSettings,
) -> Result<UnitOutcome, UpgradeError> {
    let path = layout::link_path(&project.root);
    let meta: Value = match fsx::read_json(&path) {
        Ok(meta) => meta,
        Err(err) => {
            tracing::debug!("no link metadata to migrate: {err}");
            return Ok(UnitOutcome::skipped("no readable treeline.json"));
        }
    };

    if meta.get(layout::LEGACY_LINK_MARKER).is_none() {
        return Ok(UnitOutcome::skipped("link metadata already current"));
    }

    let id = match meta.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(UpgradeError::MissingLinkId { path }),
    };

    let request = LinkRequest {
        project_type: project.project_type,
        dir: project.root.clone(),
        id: id.clone(),
        credentials_path: settings.credentials_path.clone(),
        api_base_url: settings.api_base_url.clone(),
    };
    linker.establish_link(&request)?;
    tracing::info!("re-linked {} to {id}", project.root.display());
    Ok(UnitOutcome::done(format!("re-linked project {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use treeline_core::{LinkError, ProjectType};

    #[derive(Default)]
    struct RecordingLinker {
        calls: Mutex<Vec<LinkRequest>>,
        fail: bool,
    }

    impl ProjectLinker for RecordingLinker {
        fn establish_link(&self, request: &LinkRequest) -> Result<(), LinkError> {
            self.calls.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(LinkError::Remote("HTTP 503".into()));
            }
            Ok(())
        }
    }

    fn settings() -> LinkSettings {
        LinkSettings {
            api_base_url: "http://localhost:1337".into(),
            credentials_path: PathBuf::from("/home/u/.treeline.secret.json"),
        }
    }

    fn project_with_link(content: Option<&str>) -> (TempDir, ProjectRef) {
        let tmp = TempDir::new().unwrap();
        if let Some(content) = content {
            fs::write(tmp.path().join("treeline.json"), content).unwrap();
        }
        let project = ProjectRef::new(tmp.path(), ProjectType::App);
        (tmp, project)
    }

    #[test]
    fn missing_link_file_is_a_quiet_skip() {
        let (_tmp, project) = project_with_link(None);
        let linker = RecordingLinker::default();
        let outcome = migrate_link(&project, &linker, &settings()).unwrap();
        assert!(matches!(outcome, UnitOutcome::Skipped { .. }));
        assert!(linker.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn garbage_link_file_is_a_quiet_skip() {
        let (_tmp, project) = project_with_link(Some("not json"));
        let linker = RecordingLinker::default();
        assert!(matches!(
            migrate_link(&project, &linker, &settings()).unwrap(),
            UnitOutcome::Skipped { .. }
        ));
        assert!(linker.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn current_schema_is_left_alone() {
        let (_tmp, project) =
            project_with_link(Some(r#"{"id":"7","type":"app","identity":"a","displayName":"A"}"#));
        let linker = RecordingLinker::default();
        assert_eq!(
            migrate_link(&project, &linker, &settings()).unwrap(),
            UnitOutcome::skipped("link metadata already current")
        );
        assert!(linker.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn legacy_schema_relinks_with_project_details() {
        let (_tmp, project) = project_with_link(Some(r#"{"id":42,"fullName":"Old App"}"#));
        let linker = RecordingLinker::default();
        let outcome = migrate_link(&project, &linker, &settings()).unwrap();
        assert!(matches!(outcome, UnitOutcome::Done { .. }));

        let calls = linker.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "42");
        assert_eq!(calls[0].project_type, ProjectType::App);
        assert_eq!(calls[0].dir, project.root);
        assert_eq!(calls[0].api_base_url, "http://localhost:1337");
    }

    #[test]
    fn linker_failure_is_reported_as_error() {
        let (_tmp, project) = project_with_link(Some(r#"{"id":"9","fullName":"Old"}"#));
        let linker = RecordingLinker {
            fail: true,
            ..Default::default()
        };
        let err = migrate_link(&project, &linker, &settings()).unwrap_err();
        assert!(matches!(err, UpgradeError::Link(_)));
    }

    #[test]
    fn legacy_schema_without_id_is_an_error() {
        let (_tmp, project) = project_with_link(Some(r#"{"fullName":"Old"}"#));
        let linker = RecordingLinker::default();
        let err = migrate_link(&project, &linker, &settings()).unwrap_err();
        assert!(matches!(err, UpgradeError::MissingLinkId { .. }));
        assert!(linker.calls.lock().unwrap().is_empty());
    }
}
