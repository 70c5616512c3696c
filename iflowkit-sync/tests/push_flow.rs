//! Push flow tests against real git repositories.
//!
//! The CPI phase only starts after the transport plan is persisted and the
//! profile is resolved; with no profile configured, each run stops right
//! there. That boundary lets these tests drive the full git phase, plan
//! persistence, checkpoint layout, logs commits and resume behavior
//! without a tenant.

mod common;

use std::fs;

use common::{engine_context, git, origin_subjects, sync_repo_with_origin, write_file};
use iflowkit_core::types::{ArtifactKey, ArtifactKind, TenantEnv};
use iflowkit_sync::engine::push::{self, PushOptions, PushOutcome};
use iflowkit_sync::{TransportStatus, TransportStore, TransportType};
use tempfile::TempDir;

fn push_opts() -> PushOptions {
    PushOptions {
        to: None,
        message: String::new(),
    }
}

#[test]
fn clean_repo_reports_no_changes() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo_with_origin(&tmp);
    let ctx = engine_context(&tmp);

    let outcome = push::run(&ctx, &repo, &push_opts()).unwrap();
    assert!(matches!(outcome, PushOutcome::NoChanges));

    // No transport record was created.
    let store = TransportStore::new(&repo, TenantEnv::Dev);
    assert!(store.load_latest().unwrap().is_none());
}

#[test]
fn non_content_commit_pushes_git_only() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo_with_origin(&tmp);
    let ctx = engine_context(&tmp);

    write_file(&repo, "README.md", "# docs only");
    git(&repo, &["add", "-A"]);
    git(&repo, &["commit", "-m", "docs"]);

    let outcome = push::run(&ctx, &repo, &push_opts()).unwrap();
    assert!(matches!(outcome, PushOutcome::GitOnly));

    // The commit reached origin; no CPI work was planned.
    assert_eq!(origin_subjects(&tmp)[0], "docs");
    let store = TransportStore::new(&repo, TenantEnv::Dev);
    assert!(store.load_latest().unwrap().is_none());
}

#[test]
fn content_change_plans_upload_and_persists_pending_record() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo_with_origin(&tmp);
    let ctx = engine_context(&tmp);

    // Uncommitted content change: the engine commits it with the strict
    // message format, pushes, persists the plan, then stops at the
    // (unconfigured) profile.
    write_file(
        &repo,
        "IntegrationPackage/iFlows/Order_Create/src/main/resources/flow.iflw",
        "<bpmn2 changed/>",
    );

    let err = push::run(&ctx, &repo, &push_opts()).unwrap_err();
    assert!(err.to_string().contains("no profile selected"));

    // Plan persisted before the failure, remainders intact.
    let store = TransportStore::new(&repo, TenantEnv::Dev);
    let (rec, _) = store.load_latest().unwrap().expect("record exists");
    assert_eq!(rec.transport_type, TransportType::Push);
    assert_eq!(rec.transport_status, TransportStatus::Pending);
    assert_eq!(rec.package_id, "com.example.pkg");
    assert_eq!(rec.branch, "dev");
    assert_eq!(
        rec.upload_remaining,
        vec![ArtifactKey::new(ArtifactKind::IFlows, "Order_Create")]
    );
    assert_eq!(rec.objects, rec.upload_remaining);
    assert!(rec.delete_remaining.is_empty());
    assert!(rec.deploy_remaining.is_empty());
    assert_eq!(rec.git_user_name, "Test User");
    assert_eq!(rec.git_commits.len(), 1);

    // Both the contents commit and the deferred logs commit were pushed.
    let subjects = origin_subjects(&tmp);
    let id = &rec.transport_id;
    assert_eq!(subjects[0], format!("{id} push logs"));
    assert_eq!(subjects[1], format!("{id} push contents"));
}

#[test]
fn rerun_resumes_the_same_pending_transport() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo_with_origin(&tmp);
    let ctx = engine_context(&tmp);

    write_file(
        &repo,
        "IntegrationPackage/iFlows/Order_Create/src/main/resources/flow.iflw",
        "<bpmn2 v2/>",
    );
    push::run(&ctx, &repo, &push_opts()).unwrap_err();

    let store = TransportStore::new(&repo, TenantEnv::Dev);
    let (first, _) = store.load_latest().unwrap().unwrap();

    // Second run with more work merges into the same transport.
    write_file(
        &repo,
        "IntegrationPackage/Scripts/Utils/script.groovy",
        "println 'hi'",
    );
    push::run(&ctx, &repo, &push_opts()).unwrap_err();

    let (second, _) = store.load_latest().unwrap().unwrap();
    assert_eq!(second.transport_id, first.transport_id);
    assert_eq!(
        second.upload_remaining,
        vec![
            ArtifactKey::new(ArtifactKind::Scripts, "Utils"),
            ArtifactKey::new(ArtifactKind::IFlows, "Order_Create"),
        ]
    );

    // Still a single index entry for the resumed transport.
    let index: serde_json::Value = serde_json::from_slice(
        &fs::read(repo.join(".iflowkit/transports/dev/index.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(index["items"].as_array().unwrap().len(), 1);
}

#[test]
fn deleted_artifact_folder_plans_a_delete() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo_with_origin(&tmp);
    let ctx = engine_context(&tmp);

    fs::remove_dir_all(repo.join("IntegrationPackage/iFlows/Order_Create")).unwrap();

    let err = push::run(&ctx, &repo, &push_opts()).unwrap_err();
    assert!(err.to_string().contains("no profile selected"));

    let store = TransportStore::new(&repo, TenantEnv::Dev);
    let (rec, _) = store.load_latest().unwrap().unwrap();
    assert_eq!(
        rec.delete_remaining,
        vec![ArtifactKey::new(ArtifactKind::IFlows, "Order_Create")]
    );
    assert_eq!(rec.deleted_objects, rec.delete_remaining);
    assert!(rec.upload_remaining.is_empty());
    assert_eq!(rec.transport_status, TransportStatus::Pending);
}

#[test]
fn ignored_paths_do_not_plan_cpi_work() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo_with_origin(&tmp);
    let ctx = engine_context(&tmp);

    // metainfo.prop is covered by the built-in ignore defaults.
    write_file(
        &repo,
        "IntegrationPackage/iFlows/Order_Create/metainfo.prop",
        "volatile=1",
    );
    git(&repo, &["add", "-A"]);
    git(&repo, &["commit", "-m", "volatile noise"]);

    let outcome = push::run(&ctx, &repo, &push_opts()).unwrap();
    assert!(matches!(outcome, PushOutcome::GitOnly));
}

#[test]
fn work_branch_push_is_accepted() {
    let tmp = TempDir::new().unwrap();
    let repo = sync_repo_with_origin(&tmp);
    let ctx = engine_context(&tmp);

    git(&repo, &["checkout", "-b", "feature/new-flow"]);
    write_file(
        &repo,
        "IntegrationPackage/iFlows/Order_Create/src/main/resources/flow.iflw",
        "<bpmn2 feature/>",
    );

    // The plan is made against the DEV tenant; the failure is the missing
    // profile, not the branch.
    let err = push::run(&ctx, &repo, &push_opts()).unwrap_err();
    assert!(err.to_string().contains("no profile selected"));

    let store = TransportStore::new(&repo, TenantEnv::Dev);
    let (rec, _) = store.load_latest().unwrap().unwrap();
    assert_eq!(rec.branch, "feature/new-flow");
}
