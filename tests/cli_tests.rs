//! CLI tests for shared-storages
//!
//! This test suite covers:
//! - Argument parsing and help output
//! - Synthesis from a seeded context file
//! - Strict review and exit codes
//! - Context cache management
//! - Error handling for unresolved lookups

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const CONTEXT_FILE: &str = "cdk.context.json";

// Helper to get a command isolated from the caller's environment
fn shared_storages_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shared-storages").unwrap();
    cmd.current_dir(dir)
        .env_remove("CDK_DEFAULT_ACCOUNT")
        .env_remove("CDK_DEFAULT_REGION")
        .env_remove("AWS_REGION")
        .env_remove("AWS_DEFAULT_REGION")
        .env_remove("SHARED_STORAGES_CONFIG")
        .env_remove("SHARED_STORAGES_VPC_NAME")
        .env_remove("SHARED_STORAGES_STACK_NAME")
        .env_remove("SHARED_STORAGES_OUTDIR")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

// Helper to create a workspace with a seeded context file
fn seeded_workspace() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = seed_context(&dir.path().join(CONTEXT_FILE), &sample_props(), &sample_vpc());
    (dir, path)
}

fn target_args() -> [&'static str; 4] {
    ["--account", TEST_ACCOUNT, "--region", TEST_REGION]
}

// ============================================================================
// Argument Parsing
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    let dir = tempdir().unwrap();
    shared_storages_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synth"))
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("context"));
}

#[test]
fn test_version_flag() {
    let dir = tempdir().unwrap();
    shared_storages_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_subcommand_fails() {
    let dir = tempdir().unwrap();
    shared_storages_cmd(dir.path())
        .arg("deploy")
        .assert()
        .failure();
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempdir().unwrap();
    shared_storages_cmd(dir.path())
        .args(["--config", "absent.toml", "context", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

// ============================================================================
// Synth
// ============================================================================

#[test]
fn test_synth_from_cached_context() {
    let (dir, _) = seeded_workspace();
    shared_storages_cmd(dir.path())
        .args(["synth", "--no-lookups", "-o", "out"])
        .args(target_args())
        .assert()
        .success()
        .stdout(predicate::str::contains("AWS::EFS::FileSystem"))
        .stdout(predicate::str::contains("ecsappefsefsrootaccesspoint3D627884"))
        .stderr(predicate::str::contains("open-ingress"));

    let template = dir.path().join("out").join("SharedStoragesStack.template.json");
    let manifest = dir.path().join("out").join("manifest.json");
    assert!(template.exists());
    assert!(manifest.exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(manifest).unwrap()).unwrap();
    assert_eq!(
        manifest["artifacts"]["SharedStoragesStack"]["environment"],
        "aws://123456789012/eu-west-1"
    );
    assert_eq!(
        manifest["artifacts"]["SharedStoragesStack"]["properties"]["templateFile"],
        "SharedStoragesStack.template.json"
    );
}

#[test]
fn test_synth_reads_environment_variables() {
    let (dir, _) = seeded_workspace();
    shared_storages_cmd(dir.path())
        .env("CDK_DEFAULT_ACCOUNT", TEST_ACCOUNT)
        .env("CDK_DEFAULT_REGION", TEST_REGION)
        .args(["synth", "--no-lookups", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(dir
        .path()
        .join("cdk.out")
        .join("SharedStoragesStack.template.json")
        .exists());
}

#[test]
fn test_synth_yaml_format() {
    let (dir, _) = seeded_workspace();
    shared_storages_cmd(dir.path())
        .args(["synth", "--no-lookups", "--format", "yaml", "-o", "out"])
        .args(target_args())
        .assert()
        .success()
        .stdout(predicate::str::contains("AWSTemplateFormatVersion: 2010-09-09").or(
            predicate::str::contains("AWSTemplateFormatVersion: '2010-09-09'"),
        ));

    assert!(dir
        .path()
        .join("out")
        .join("SharedStoragesStack.template.yaml")
        .exists());
}

#[test]
fn test_synth_json_summary() {
    let (dir, _) = seeded_workspace();
    let output = shared_storages_cmd(dir.path())
        .args(["--output", "json", "synth", "--no-lookups", "-o", "out"])
        .args(target_args())
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["stack"], "SharedStoragesStack");
    assert_eq!(summary["vpcId"], "vpc-0123456789abcdef0");
    assert_eq!(summary["resources"], 8);
    assert_eq!(summary["findings"][0]["rule_id"], "open-ingress");
}

#[test]
fn test_synth_strict_fails_on_findings() {
    let (dir, _) = seeded_workspace();
    shared_storages_cmd(dir.path())
        .args(["synth", "--no-lookups", "--strict", "-o", "out"])
        .args(target_args())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ERROR"));

    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_synth_without_cached_context_fails() {
    let dir = tempdir().unwrap();
    shared_storages_cmd(dir.path())
        .args(["synth", "--no-lookups"])
        .args(target_args())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("HINT"));
}

#[test]
fn test_synth_without_environment_fails() {
    let (dir, _) = seeded_workspace();
    shared_storages_cmd(dir.path())
        .args(["synth", "--no-lookups"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("account"));
}

// ============================================================================
// Graph and Lookup
// ============================================================================

#[test]
fn test_graph_mermaid() {
    let (dir, _) = seeded_workspace();
    shared_storages_cmd(dir.path())
        .args(["graph", "--no-lookups", "--format", "mermaid"])
        .args(target_args())
        .assert()
        .success()
        .stdout(predicate::str::contains("ecsappefsE2A6169C"));
}

#[test]
fn test_lookup_uses_cached_context() {
    let (dir, _) = seeded_workspace();
    shared_storages_cmd(dir.path())
        .args(["--output", "json", "lookup"])
        .args(target_args())
        .assert()
        .success()
        .stdout(predicate::str::contains("vpc-0123456789abcdef0"));
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn test_context_list_and_reset() {
    let (dir, path) = seeded_workspace();

    shared_storages_cmd(dir.path())
        .args(["context", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "vpc-provider:account=123456789012:filter.tag:Name=AriefhInfraStack/dev-vpc",
        ));

    shared_storages_cmd(dir.path())
        .args(["context", "reset", "1"])
        .assert()
        .success();

    let content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(content, serde_json::json!({}));

    shared_storages_cmd(dir.path())
        .args(["context", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached context."));
}

#[test]
fn test_context_reset_unknown_key_fails() {
    let (dir, _) = seeded_workspace();
    shared_storages_cmd(dir.path())
        .args(["context", "reset", "missing-key"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No context entry"));
}

#[test]
fn test_context_clear_with_custom_file() {
    let dir = tempdir().unwrap();
    let path = seed_context(&dir.path().join("other.json"), &sample_props(), &sample_vpc());

    shared_storages_cmd(dir.path())
        .args(["--context-file", "other.json", "context", "clear"])
        .assert()
        .success();

    let content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(content, serde_json::json!({}));
}
