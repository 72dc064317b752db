use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::{json, Value};
use tempfile::TempDir;

const MODELS: &str = r#"
version: 1
numberThreads: 2
defaults:
  default:
    exactAttributes: [createDate, status, version, name, title, description, size]
handlers:
  - id: journal
    entityTypes: [journal.Article]
  - id: wiki
    entityTypes: [wiki.Page]
models:
  - entityType: journal.Article
    primaryKey: id
    audited: true
    grouped: true
    resourced: true
    staged: true
    workflowed: true
  - entityType: wiki.Page
    primaryKey: pageId
    grouped: true
    staged: true
    variant: ignoreName
"#;

fn stagecheck_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("stagecheck"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("RUST_LOG", "warn")
        .env("NO_COLOR", "1");
    cmd
}

fn write_json(path: &Path, value: Value) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, serde_json::to_vec_pretty(&value).expect("json")).expect("write");
}

/// Home with `~/.stagecheck/models.yaml` plus a two-scope snapshot.
fn fixture() -> (TempDir, TempDir) {
    let home = TempDir::new().expect("home");
    let models = home.path().join(".stagecheck").join("models.yaml");
    fs::create_dir_all(models.parent().expect("parent")).expect("mkdir");
    fs::write(&models, MODELS).expect("write models");

    let data = TempDir::new().expect("data");
    write_json(
        &data.path().join("scopes.json"),
        json!([
            { "id": 20, "tenantId": 1, "name": "Guest" },
            { "id": 30, "tenantId": 1, "name": "Docs" }
        ]),
    );
    write_json(
        &data.path().join("staging/1/20/journal.Article.json"),
        json!([
            { "uuid": "art-a", "pk": 1, "attributes": { "status": 0, "title": "T1" } },
            { "uuid": "art-b", "pk": 2, "attributes": { "status": 0 } }
        ]),
    );
    write_json(
        &data.path().join("live/1/20/journal.Article.json"),
        json!([
            { "uuid": "art-a", "pk": 9, "attributes": { "status": 2, "title": "T1" } }
        ]),
    );
    write_json(
        &data.path().join("staging/1/30/wiki.Page.json"),
        json!([
            { "uuid": "page-1", "pk": 1, "attributes": { "name": "Home", "title": "Home" } }
        ]),
    );
    write_json(
        &data.path().join("live/1/30/wiki.Page.json"),
        json!([
            { "uuid": "page-1", "pk": 5, "attributes": { "name": "Start", "title": "Home" } }
        ]),
    );
    (home, data)
}

#[test]
fn check_prints_one_table_per_scope() {
    let (home, data) = fixture();
    stagecheck_cmd(home.path())
        .args(["check", "--data"])
        .arg(data.path())
        .assert()
        .success()
        .stdout(contains("SCOPE 20 - Guest"))
        .stdout(contains("both-inexact"))
        .stdout(contains("art-a"))
        .stdout(contains("staging-only"))
        .stdout(contains("art-b"))
        .stdout(contains("SCOPE 30 - Docs"))
        .stdout(contains("both-exact"));
}

#[test]
fn check_json_follows_scope_and_entity_order() {
    let (home, data) = fixture();
    let output = stagecheck_cmd(home.path())
        .args(["check", "--json", "--data"])
        .arg(data.path())
        .output()
        .expect("run");
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("json");
    let scopes = report.as_array().expect("array");
    assert_eq!(scopes.len(), 2);
    assert_eq!(scopes[0]["scope"]["id"], 20);
    assert_eq!(scopes[1]["scope"]["id"], 30);

    let guest = scopes[0]["results"].as_array().expect("results");
    let types: Vec<&str> = guest
        .iter()
        .map(|r| r["entityType"].as_str().expect("entity type"))
        .collect();
    assert_eq!(types, ["journal.Article", "wiki.Page"]);
    assert_eq!(guest[0]["both-inexact"].as_array().map(Vec::len), Some(1));
    assert_eq!(guest[0]["staging-only"].as_array().map(Vec::len), Some(1));
    assert!(guest[1].get("both-exact").is_none(), "empty categories are omitted");

    // Name differs but wiki pages ignore it.
    let docs = scopes[1]["results"].as_array().expect("results");
    assert_eq!(docs[1]["both-exact"].as_array().map(Vec::len), Some(1));
}

#[test]
fn check_show_limits_categories() {
    let (home, data) = fixture();
    stagecheck_cmd(home.path())
        .args(["check", "--show", "only-staging", "--scope", "20", "--data"])
        .arg(data.path())
        .assert()
        .success()
        .stdout(contains("staging-only"))
        .stdout(contains("both-inexact").not())
        .stdout(contains("SCOPE 30").not());
}

#[test]
fn malformed_snapshot_becomes_error_row_not_failure() {
    let (home, data) = fixture();
    fs::write(data.path().join("live/1/20/journal.Article.json"), b"[{").expect("corrupt");
    stagecheck_cmd(home.path())
        .args(["check", "--entity", "journal.Article", "--data"])
        .arg(data.path())
        .assert()
        .success()
        .stdout(contains("error"))
        .stdout(contains("fetch: live dataset"));
}

#[test]
fn unknown_scope_is_fatal() {
    let (home, data) = fixture();
    stagecheck_cmd(home.path())
        .args(["check", "--scope", "99", "--data"])
        .arg(data.path())
        .assert()
        .failure()
        .stderr(contains("scope 99"));
}

#[test]
fn unknown_entity_is_reported_as_policy_error() {
    let (home, data) = fixture();
    let output = stagecheck_cmd(home.path())
        .args(["check", "--json", "--scope", "20", "--entity", "journal.Article"])
        .args(["--entity", "blogs.Entry", "--data"])
        .arg(data.path())
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("blogs.Entry"));

    let report: Value = serde_json::from_slice(&output.stdout).expect("json");
    let results = report[0]["results"].as_array().expect("results");
    assert_eq!(results.len(), 2);
    assert!(results[0].get("error").is_none());
    assert_eq!(results[1]["entityType"], "blogs.Entry");
    let error = results[1]["error"].as_str().expect("error");
    assert!(error.starts_with("policy: "), "got: {error}");
}

#[test]
fn missing_registry_is_reported() {
    let home = TempDir::new().expect("home");
    let data = TempDir::new().expect("data");
    stagecheck_cmd(home.path())
        .args(["check", "--data"])
        .arg(data.path())
        .assert()
        .failure()
        .stderr(contains("models.yaml"));
}

#[test]
fn models_lists_policies() {
    let (home, _data) = fixture();
    stagecheck_cmd(home.path())
        .arg("models")
        .assert()
        .success()
        .stdout(contains("journal.Article"))
        .stdout(contains("ignoreName"))
        .stdout(contains("agrsw"));

    let output = stagecheck_cmd(home.path())
        .args(["models", "--json"])
        .output()
        .expect("run");
    let models: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(models[1]["entityType"], "wiki.Page");
    assert_eq!(models[1]["handler"], "wiki");
    let fetched: Vec<&str> = models[1]["fetchAttributes"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(!fetched.contains(&"name"));
}
