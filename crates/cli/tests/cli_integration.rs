//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `modelmap` binary and verify
//! exit codes, stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative
//! paths to the demo bundle resolve correctly.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BUNDLE: &str = "demos/users.json";
const USER: &str = "demos/user.json";

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `modelmap` binary, rooted at workspace.
fn modelmap() -> Command {
    let mut cmd = cargo_bin_cmd!("modelmap");
    cmd.current_dir(workspace_root());
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout is JSON")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    modelmap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Map JSON data through schema bundles"));
}

#[test]
fn version_exits_0() {
    modelmap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("modelmap"));
}

// ──────────────────────────────────────────────
// 2. Mapping subcommands
// ──────────────────────────────────────────────

#[test]
fn from_data_prints_local_view() {
    let out = stdout_json(modelmap().args(["from-data", "--schema", BUNDLE, "--model", "User", USER]));
    assert_eq!(out["name"], json!("Charles Lo"));
    assert_eq!(out["company"]["address"], json!("深圳市南山区腾讯大厦"));
    assert_eq!(out["contacts"][1]["number"], json!("wx199111111"));
    assert_eq!(out["birthday"], json!("1991-12-26T00:00:00Z"));
}

#[test]
fn to_data_reads_stdin() {
    let out = stdout_json(
        modelmap()
            .args(["to-data", "--schema", BUNDLE, "--model", "Contact", "-"])
            .write_stdin(r#"[{ "number": "1" }, { "type": "邮箱", "number": "a@b.c" }]"#),
    );
    assert_eq!(
        out,
        json!([
            { "id": 0, "lei_xin": "手机", "hao_ma": "1" },
            { "id": 0, "lei_xin": "邮箱", "hao_ma": "a@b.c" }
        ])
    );
}

#[test]
fn round_trip_preserves_field_paths() {
    let out = stdout_json(modelmap().args(["round-trip", "--schema", BUNDLE, "--model", "User", USER]));
    assert_eq!(out["xing_ming"], json!("Charles Lo"));
    assert_eq!(out["gong_si"]["ming_cheng"], json!("深圳市腾讯计算机系统有限公司"));
    assert_eq!(out["lian_xi_fang_shi"].as_array().map(Vec::len), Some(3));
}

#[test]
fn input_file_in_temp_dir() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("category.json");
    fs::write(
        &input,
        r#"{ "meta": { "title": "root" }, "sub": [ { "meta": { "title": "leaf" } } ] }"#,
    )
    .unwrap();
    let out = stdout_json(modelmap().args([
        "from-data",
        "--schema",
        BUNDLE,
        "--model",
        "Category",
        input.to_str().unwrap(),
    ]));
    assert_eq!(out["title"], json!("root"));
    assert_eq!(out["children"][0]["title"], json!("leaf"));
    assert_eq!(out["budget"], json!("0"));
}

#[test]
fn quiet_suppresses_output() {
    modelmap()
        .args(["from-data", "--quiet", "--schema", BUNDLE, "--model", "User", USER])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 3. Inspect
// ──────────────────────────────────────────────

#[test]
fn inspect_text_lists_models() {
    modelmap()
        .args(["inspect", "--schema", BUNDLE])
        .assert()
        .success()
        .stdout(predicate::str::contains("User (5 attributes)"))
        .stdout(predicate::str::contains(
            "contacts : [Contact] [model-collection] <- lian_xi_fang_shi",
        ));
}

#[test]
fn inspect_json_output() {
    let out = stdout_json(modelmap().args(["inspect", "--output", "json", "--schema", BUNDLE]));
    let names: Vec<_> = out["models"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Category", "Company", "Contact", "User"]);
}

// ──────────────────────────────────────────────
// 4. Errors
// ──────────────────────────────────────────────

#[test]
fn unknown_model_exits_1() {
    modelmap()
        .args(["from-data", "--schema", BUNDLE, "--model", "Nope", USER])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown model 'Nope'"));
}

#[test]
fn missing_schema_file_exits_1() {
    modelmap()
        .args(["inspect", "--schema", "demos/missing.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("schema file not found"));
}

#[test]
fn json_error_output_carries_kind() {
    let dir = TempDir::new().unwrap();
    let bundle = dir.path().join("cyclic.json");
    fs::write(
        &bundle,
        r#"{ "models": [ { "name": "A", "attributes": { "b": "B" } }, { "name": "B", "attributes": { "a": "A" } } ] }"#,
    )
    .unwrap();
    let assert = modelmap()
        .args(["inspect", "--output", "json", "--schema", bundle.to_str().unwrap()])
        .assert()
        .failure()
        .code(1);
    let err: serde_json::Value = serde_json::from_slice(&assert.get_output().stderr).unwrap();
    assert_eq!(err["error"]["kind"], json!("cyclic_reference"));
    assert_eq!(err["error"]["message"], json!("cyclic model references: A -> B -> A"));
}

#[test]
fn invalid_date_reports_coercion_error() {
    modelmap()
        .args(["from-data", "--schema", BUNDLE, "--model", "User", "-"])
        .write_stdin(r#"{ "sheng_ri": "someday" }"#)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot construct Date"));
}
