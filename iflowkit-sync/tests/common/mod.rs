//! Shared scaffolding: a sync repo with valid metadata, a bare origin, and
//! an engine context rooted in a TempDir (no profile configured).

// Not every test target uses every helper.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use iflowkit_core::store::Paths;
use iflowkit_sync::EngineContext;
use tempfile::TempDir;

pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(
        out.status.success(),
        "git {args:?} failed: {}{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn engine_context(root: &TempDir) -> EngineContext {
    EngineContext::new(Paths::at(root.path().join("config")), None)
}

/// A sync repo on `dev` with one committed iFlow, pushed to a bare origin.
pub fn sync_repo_with_origin(root: &TempDir) -> PathBuf {
    let bare = root.path().join("origin.git");
    let repo = root.path().join("repo");
    fs::create_dir_all(&repo).unwrap();
    git(root.path(), &["init", "--bare", bare.to_str().unwrap()]);

    write_file(
        &repo,
        ".iflowkit/package.json",
        r#"{
  "schemaVersion": 1,
  "profileId": "acme",
  "cpiTenantLevels": 2,
  "packageId": "com.example.pkg",
  "packageName": "Example",
  "baseFolder": "IntegrationPackage",
  "gitRemote": "https://github.com/acme/com.example.pkg.git",
  "gitProvider": "github",
  "createdAt": "2026-01-01T00:00:00Z"
}"#,
    );
    write_file(&repo, "IntegrationPackage/IntegrationPackage.json", "{}");
    write_file(
        &repo,
        "IntegrationPackage/iFlows/Order_Create/src/main/resources/flow.iflw",
        "<bpmn2/>",
    );
    write_file(&repo, ".gitignore", ".DS_Store\n*.log\n");

    git(&repo, &["init"]);
    git(&repo, &["config", "user.email", "test@example.com"]);
    git(&repo, &["config", "user.name", "Test User"]);
    git(&repo, &["checkout", "-b", "dev"]);
    git(&repo, &["add", "-A"]);
    git(&repo, &["commit", "-m", "seed"]);
    git(&repo, &["remote", "add", "origin", bare.to_str().unwrap()]);
    git(&repo, &["push", "-u", "origin", "dev"]);
    repo
}

/// Commit subjects on the bare origin's dev branch, newest first.
pub fn origin_subjects(root: &TempDir) -> Vec<String> {
    let bare = root.path().join("origin.git");
    git(&bare, &["log", "--pretty=format:%s", "dev"])
        .lines()
        .map(|l| l.to_string())
        .collect()
}
