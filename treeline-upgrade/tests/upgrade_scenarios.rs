use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tempfile::TempDir;
use treeline_core::{layout, LinkError, LinkRequest, ProjectLinker, ProjectRef, ProjectType};
use treeline_upgrade::{GeneratedFile, LinkSettings, UnitKind, UnitOutcome, Upgrader};

const LEGACY_SERVER_ERROR: &str = r#"module.exports = function serverError (data, options) {
  var req = this.req;
  var res = this.res;
  res.status(500);
  if (_.isUndefined(data)) { return res.jsonx(); }
  return res.jsonx(data);
};
"#;

const LEGACY_NEGOTIATE: &str = r#"module.exports = function negotiate (err) {
  var res = this.res;
  sails.log.verbose('res.negotiate() :: Sending error', err);
  return res.serverError(err);
};
"#;

#[derive(Default)]
struct FakeLinker {
    calls: Mutex<Vec<LinkRequest>>,
    fail: bool,
}

impl ProjectLinker for FakeLinker {
    fn establish_link(&self, request: &LinkRequest) -> Result<(), LinkError> {
        self.calls.lock().expect("lock").push(request.clone());
        if self.fail {
            return Err(LinkError::Remote("remote returned HTTP 500".into()));
        }
        let meta = serde_json::json!({
            "id": request.id,
            "type": request.project_type,
            "identity": "my-app",
            "displayName": "My App",
        });
        fs::write(
            layout::link_path(&request.dir),
            serde_json::to_string_pretty(&meta).expect("json"),
        )
        .expect("write link");
        Ok(())
    }
}

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(&path, content).expect("write");
    path
}

/// An app generated by an old CLI: legacy templates, legacy scaffolding,
/// and link metadata in the old schema.
fn legacy_app(root: &Path) {
    write(root, layout::SERVER_ERROR_RESPONSE, LEGACY_SERVER_ERROR);
    write(root, layout::NEGOTIATE_RESPONSE, LEGACY_NEGOTIATE);
    write(root, "api/machines/do-something.js", "module.exports = {};");
    write(
        root,
        "node_modules/sails-hook-machines/index.js",
        "module.exports = function () {};",
    );
    write(root, "node_modules/postinstall.js", "// generated");
    write(
        root,
        layout::MANIFEST_FILE,
        r#"{"name":"my-app","dependencies":{"sails":"~0.12.0","sails-hook-machines":"^1.0.0"}}"#,
    );
    write(
        root,
        layout::LINK_FILE,
        r#"{"id":"5519a2b9","fullName":"My App","owner":"rachael"}"#,
    );
}

fn upgrader(linker: Arc<FakeLinker>) -> Upgrader {
    Upgrader::new(
        linker,
        LinkSettings {
            api_base_url: "http://localhost:1337".into(),
            credentials_path: PathBuf::from("/home/rachael/.treeline.secret.json"),
        },
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn legacy_app_is_fully_remediated() {
    let tmp = TempDir::new().expect("tmp");
    legacy_app(tmp.path());
    let linker = Arc::new(FakeLinker::default());
    let project = ProjectRef::new(tmp.path(), ProjectType::App);

    let report = upgrader(linker.clone()).run(&project).await;

    for kind in UnitKind::all() {
        assert!(
            matches!(report.outcome(*kind), Some(UnitOutcome::Done { .. })),
            "{kind}: {:?}",
            report.outcome(*kind)
        );
    }
    for file in GeneratedFile::all() {
        let on_disk = fs::read_to_string(project.path(file.relative_path())).expect("read");
        assert_eq!(on_disk, file.current_template());
    }
    assert!(!layout::legacy_machines_dir(tmp.path()).exists());
    assert!(!layout::legacy_hook_dir(tmp.path()).exists());
    assert!(!layout::legacy_postinstall_path(tmp.path()).exists());

    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(layout::manifest_path(tmp.path())).expect("read"))
            .expect("json");
    assert!(manifest["dependencies"].get("sails-hook-machines").is_none());
    assert_eq!(manifest["dependencies"]["sails"], "~0.12.0");

    let calls = linker.calls.lock().expect("lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "5519a2b9");
    assert_eq!(calls[0].project_type, ProjectType::App);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_link_does_not_block_other_units() {
    let tmp = TempDir::new().expect("tmp");
    legacy_app(tmp.path());
    let linker = Arc::new(FakeLinker {
        fail: true,
        ..Default::default()
    });
    let project = ProjectRef::new(tmp.path(), ProjectType::App);

    let report = upgrader(linker).run(&project).await;

    let link = report.outcome(UnitKind::MigrateLink).expect("link unit");
    assert!(link.is_failed(), "got {link:?}");
    assert!(link.message().contains("HTTP 500"));
    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.changed(), UnitKind::all().len() - 1);
    assert!(!layout::legacy_machines_dir(tmp.path()).exists());

    // Legacy metadata stays put so a later run can retry.
    let link_file = fs::read_to_string(layout::link_path(tmp.path())).expect("read");
    assert!(link_file.contains("fullName"));
}

#[tokio::test(flavor = "multi_thread")]
async fn second_run_changes_nothing() {
    let tmp = TempDir::new().expect("tmp");
    legacy_app(tmp.path());
    let linker = Arc::new(FakeLinker::default());
    let project = ProjectRef::new(tmp.path(), ProjectType::App);
    let upgrader = upgrader(linker.clone());

    let first = upgrader.run(&project).await;
    assert_eq!(first.changed(), UnitKind::all().len());

    let manifest_after_first =
        fs::read_to_string(layout::manifest_path(tmp.path())).expect("read");
    let second = upgrader.run(&project).await;

    assert_eq!(second.changed(), 0, "{:?}", second.units);
    assert_eq!(second.failures().count(), 0);
    assert_eq!(
        fs::read_to_string(layout::manifest_path(tmp.path())).expect("read"),
        manifest_after_first
    );
    assert_eq!(linker.calls.lock().expect("lock").len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn machinepack_only_removes_postinstall_script() {
    let tmp = TempDir::new().expect("tmp");
    legacy_app(tmp.path());
    let project = ProjectRef::new(tmp.path(), ProjectType::Machinepack);

    let report = upgrader(Arc::new(FakeLinker::default())).run(&project).await;

    assert!(report
        .outcome(UnitKind::RemovePostinstall)
        .expect("unit")
        .is_done());
    for kind in [
        UnitKind::PatchServerError,
        UnitKind::PatchNegotiate,
        UnitKind::RemoveLegacyMachines,
        UnitKind::RemoveLegacyHook,
    ] {
        assert_eq!(
            report.outcome(kind),
            Some(&UnitOutcome::skipped("not an app project"))
        );
    }
    assert_eq!(
        fs::read_to_string(project.path(layout::SERVER_ERROR_RESPONSE)).expect("read"),
        LEGACY_SERVER_ERROR
    );
    assert!(layout::legacy_machines_dir(tmp.path()).exists());
}

#[test]
fn missing_project_directory_is_not_fatal() {
    let tmp = TempDir::new().expect("tmp");
    let project = ProjectRef::new(tmp.path().join("does-not-exist"), ProjectType::App);

    let report = upgrader(Arc::new(FakeLinker::default()))
        .run_blocking(&project)
        .expect("runtime");

    assert_eq!(report.units.len(), UnitKind::all().len());
    assert_eq!(report.changed(), 0);
    assert_eq!(report.failures().count(), 0);
    assert!(!project.root.exists());
}
