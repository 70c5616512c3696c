//! End-to-end argument and policy-gate tests for the `iflowkit` binary.
//!
//! These exercise everything that fails before any network access:
//! argument validation, repo discovery, branch routing, and the PRD gate.

use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn iflowkit(cwd: &Path, config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("iflowkit").expect("binary");
    cmd.current_dir(cwd)
        .env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home);
    cmd
}

fn git(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("run git");
    assert!(status.success(), "git {args:?} failed");
}

/// A committed sync repo on the given branch with valid metadata.
fn sync_repo(root: &TempDir, branch: &str, levels: u8) -> std::path::PathBuf {
    let repo = root.path().join("repo");
    fs::create_dir_all(repo.join(".iflowkit")).unwrap();
    fs::create_dir_all(repo.join("IntegrationPackage")).unwrap();
    fs::write(
        repo.join(".iflowkit/package.json"),
        format!(
            r#"{{
  "schemaVersion": 1,
  "profileId": "acme",
  "cpiTenantLevels": {levels},
  "packageId": "com.example.pkg",
  "packageName": "Example",
  "baseFolder": "IntegrationPackage",
  "gitRemote": "https://github.com/acme/com.example.pkg.git",
  "gitProvider": "github",
  "createdAt": "2026-01-01T00:00:00Z"
}}"#
        ),
    )
    .unwrap();
    fs::write(repo.join("IntegrationPackage/IntegrationPackage.json"), "{}").unwrap();

    git(&repo, &["init"]);
    git(&repo, &["config", "user.email", "test@example.com"]);
    git(&repo, &["config", "user.name", "Test"]);
    git(&repo, &["checkout", "-b", branch]);
    git(&repo, &["add", "-A"]);
    git(&repo, &["commit", "-m", "seed"]);
    repo
}

#[test]
fn unknown_subcommand_fails_with_usage() {
    let tmp = TempDir::new().unwrap();
    iflowkit(tmp.path(), tmp.path())
        .args(["sync", "frobnicate"])
        .assert()
        .failure();
}

#[test]
fn push_outside_repo_reports_missing_marker() {
    let tmp = TempDir::new().unwrap();
    iflowkit(tmp.path(), tmp.path())
        .args(["sync", "push"])
        .assert()
        .failure()
        .stderr(contains("not inside a sync repository"));
}

#[test]
fn deliver_requires_target_env() {
    let tmp = TempDir::new().unwrap();
    iflowkit(tmp.path(), tmp.path())
        .args(["sync", "deliver"])
        .assert()
        .failure()
        .stderr(contains("--to"));
}

#[test]
fn deliver_rejects_dev_target() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo(&tmp, "dev", 3);
    iflowkit(&repo, tmp.path())
        .args(["sync", "deliver", "--to", "dev"])
        .assert()
        .failure()
        .stderr(contains("--to must be qas or prd"));
}

#[test]
fn deliver_rejects_invalid_env_value() {
    let tmp = TempDir::new().unwrap();
    iflowkit(tmp.path(), tmp.path())
        .args(["sync", "deliver", "--to", "staging"])
        .assert()
        .failure()
        .stderr(contains("invalid environment 'staging'"));
}

#[test]
fn prd_gate_blocks_push_without_confirmation() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo(&tmp, "prd", 2);
    iflowkit(&repo, tmp.path())
        .args(["sync", "push"])
        .assert()
        .failure()
        .stderr(contains(
            "refusing to run against PRD without explicit confirmation",
        ));
}

#[test]
fn push_rejects_unsupported_branch() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo(&tmp, "main", 2);
    iflowkit(&repo, tmp.path())
        .args(["sync", "push"])
        .assert()
        .failure()
        .stderr(contains("only allowed on environment branches"));
}

#[test]
fn push_rejects_qas_branch_on_two_tier_landscape() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo(&tmp, "qas", 2);
    iflowkit(&repo, tmp.path())
        .args(["sync", "push"])
        .assert()
        .failure()
        .stderr(contains("branch 'qas' is not enabled"));
}

#[test]
fn to_flag_must_match_resolved_tenant() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo(&tmp, "dev", 3);
    iflowkit(&repo, tmp.path())
        .args(["sync", "pull", "--to", "qas"])
        .assert()
        .failure()
        .stderr(contains("--to qas does not match target tenant dev"));
}

#[test]
fn pull_rejects_work_branches() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo(&tmp, "feature/new-flow", 2);
    iflowkit(&repo, tmp.path())
        .args(["sync", "pull"])
        .assert()
        .failure()
        .stderr(contains("only allowed on environment branches"));
}

#[test]
fn compare_rejects_qas_on_two_tier_landscape() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo(&tmp, "dev", 2);
    iflowkit(&repo, tmp.path())
        .args(["sync", "compare", "--to", "qas"])
        .assert()
        .failure()
        .stderr(contains("qas compare is not enabled"));
}

#[test]
fn deliver_requires_clean_working_tree() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo(&tmp, "dev", 3);
    fs::write(repo.join("IntegrationPackage/uncommitted.txt"), "x").unwrap();
    iflowkit(&repo, tmp.path())
        .args(["sync", "deliver", "--to", "qas"])
        .assert()
        .failure()
        .stderr(contains("working tree is not clean"));
}

#[test]
fn init_requires_profile() {
    let tmp = TempDir::new().unwrap();
    iflowkit(tmp.path(), tmp.path())
        .args(["sync", "init", "--id", "com.example.pkg"])
        .assert()
        .failure()
        .stderr(contains("no profile selected"));
}

#[test]
fn init_validates_package_id() {
    let tmp = TempDir::new().unwrap();
    iflowkit(tmp.path(), tmp.path())
        .args(["sync", "init", "--id", "has space"])
        .assert()
        .failure()
        .stderr(contains("packageId must not contain whitespace"));
}

#[test]
fn deploy_status_outside_repo_fails() {
    let tmp = TempDir::new().unwrap();
    iflowkit(tmp.path(), tmp.path())
        .args(["sync", "deploy", "status"])
        .assert()
        .failure()
        .stderr(contains("not inside a sync repository"));
}

#[test]
fn deploy_status_without_records_reports_none() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo(&tmp, "dev", 2);
    iflowkit(&repo, tmp.path())
        .args(["sync", "deploy", "status"])
        .assert()
        .success()
        .stdout(contains("No transport records found."));
}
