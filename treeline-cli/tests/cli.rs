use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const LEGACY_SERVER_ERROR: &str = "module.exports = function serverError (data) {\n  if (_.isUndefined(data)) { return this.res.send(500); }\n  return this.res.send(500, data);\n};\n";

/// Isolated home, no credentials, and an API URL nothing listens on.
fn treeline_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("treeline"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("TREELINE_API_URL", "http://127.0.0.1:1")
        .env_remove("TREELINE_KEYCHAIN")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn upgrade_patches_legacy_server_error_and_exits_zero() {
    let home = TempDir::new().expect("home");
    let project = TempDir::new().expect("project");
    let target = project.path().join("api/responses/serverError.js");
    fs::create_dir_all(target.parent().expect("parent")).expect("mkdir");
    fs::write(&target, LEGACY_SERVER_ERROR).expect("write");
    fs::create_dir_all(project.path().join("api/machines")).expect("mkdir");

    treeline_cmd(home.path())
        .arg("upgrade")
        .arg(project.path())
        .assert()
        .success()
        .stdout(contains("patch-server-error"))
        .stdout(contains("2 changed, 0 failed"));

    let patched = fs::read_to_string(&target).expect("read");
    assert!(!patched.contains("_.isUndefined"));
    assert!(patched.contains("module.exports"));
    assert!(!project.path().join("api/machines").exists());
}

#[test]
fn upgrade_json_report_lists_every_unit() {
    let home = TempDir::new().expect("home");
    let project = TempDir::new().expect("project");

    let output = treeline_cmd(home.path())
        .args(["upgrade", "--json", "--type", "machinepack"])
        .arg(project.path())
        .output()
        .expect("run");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["projectType"], "machinepack");
    let units = report["units"].as_array().expect("units");
    assert_eq!(units.len(), 6);
    assert!(units.iter().all(|u| u["status"] == "skipped"));
    assert!(report["completedAt"].is_string());
}

#[test]
fn upgrade_with_failing_relink_still_exits_zero() {
    let home = TempDir::new().expect("home");
    let project = TempDir::new().expect("project");
    fs::write(
        project.path().join("treeline.json"),
        r#"{"id":"42","fullName":"Old App"}"#,
    )
    .expect("write");

    treeline_cmd(home.path())
        .arg("upgrade")
        .arg(project.path())
        .assert()
        .success()
        .stdout(contains("migrate-link"))
        .stdout(contains("1 failed"));
}

#[test]
fn upgrade_missing_directory_exits_zero() {
    let home = TempDir::new().expect("home");
    treeline_cmd(home.path())
        .args(["upgrade"])
        .arg(home.path().join("nope"))
        .assert()
        .success();
}

#[test]
fn export_without_credentials_exits_two() {
    let home = TempDir::new().expect("home");
    let cwd = TempDir::new().expect("cwd");

    treeline_cmd(home.path())
        .current_dir(cwd.path())
        .arg("export")
        .assert()
        .code(2)
        .stderr(contains("not logged in"));
}

#[test]
fn export_with_unreachable_api_exits_one() {
    let home = TempDir::new().expect("home");
    let cwd = TempDir::new().expect("cwd");
    fs::write(
        home.path().join(".treeline.secret.json"),
        r#"{"username":"rachael","secret":"s3cr3t"}"#,
    )
    .expect("write creds");

    treeline_cmd(home.path())
        .current_dir(cwd.path())
        .args(["export", "--id", "machinepack-math"])
        .assert()
        .code(1)
        .stderr(contains("export failed"));
}

#[test]
fn unknown_project_type_is_rejected() {
    let home = TempDir::new().expect("home");
    treeline_cmd(home.path())
        .args(["upgrade", "--type", "library"])
        .assert()
        .failure()
        .stderr(contains("expected: app, machinepack"));
}
