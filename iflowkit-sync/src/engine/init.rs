//! `sync init` — bootstrap a Git repository from a CPI Integration
//! Package: create the remote repo, export the DEV tenant, write sync
//! metadata and the initial transport record, commit and push `dev`.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use iflowkit_core::fsio::atomic_write_file;
use iflowkit_core::metadata::{SyncMetadata, DEFAULT_BASE_FOLDER, MARKER_DIR};
use iflowkit_core::types::TenantEnv;
use iflowkit_cpi::CpiClient;
use iflowkit_git::driver::GitDriver;
use iflowkit_git::new_provider;
use iflowkit_git::remote::{
    build_remote_url, detect_provider_from_remote, remote_host, split_remote_namespace_and_repo,
};
use iflowkit_git::token::resolve_token;

use crate::error::{io_err, SyncError};
use crate::ignore::ensure_ignore_file;
use crate::transport::{build_transport_commit_message, new_transport_ids, TransportType};

use super::{write_init_transport, EngineContext};

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub package_id: String,
    /// Parent directory for `<packageId>/`; defaults to the working dir.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct InitOutcome {
    pub package_id: String,
    pub package_name: String,
    pub remote: String,
    pub branch: &'static str,
    pub dir: PathBuf,
}

pub fn run(ctx: &EngineContext, cwd: &Path, opts: &InitOptions) -> Result<InitOutcome, SyncError> {
    let package_id = opts.package_id.trim().to_string();
    validate_package_id(&package_id)?;

    let (profile_id, profile) = ctx.resolve_profile()?;

    // Init always reads from DEV.
    let tenant_key = ctx.tenant_key(&profile_id, TenantEnv::Dev)?;

    let remote = build_remote_url(&profile.git_server_url, &profile.cpi_path, &package_id)?;
    let provider_name = detect_provider_from_remote(&remote);
    tracing::info!(remote = %remote, provider = provider_name, "git remote resolved");

    // Package name is required before anything is created.
    let mut client = CpiClient::new(&tenant_key);
    let (pkg, raw) = client.read_integration_package(&package_id)?;
    if pkg.name.trim().is_empty() {
        return Err(SyncError::EmptyPackageName(package_id));
    }

    let dest = resolve_destination(cwd, opts.dir.as_deref(), &package_id)?;
    ensure_empty_dir(&dest)?;

    tracing::info!(package_id = %package_id, package_name = %pkg.name, "sync init started");

    if let Some(provider) = new_provider(provider_name) {
        let token = resolve_token(provider_name)?;
        let (namespace, repo_path) = split_remote_namespace_and_repo(&remote)?;
        let host = remote_host(&remote)?;
        let display_name = provider.normalize_repo_display_name(&pkg.name);
        tracing::info!(
            provider = provider_name,
            namespace = %namespace,
            repo = %repo_path,
            display_name = %display_name,
            private = true,
            "creating git repository"
        );
        provider.create_repo(&token, &host, &namespace, &repo_path, &display_name, true)?;
        tracing::info!(remote = %remote, "git repository ready");
    } else {
        tracing::warn!(
            provider = provider_name,
            remote = %remote,
            "git provider not supported for automatic repo creation; will attempt push"
        );
    }

    // Export CPI artifacts into the repository structure.
    let base_abs = dest.join(DEFAULT_BASE_FOLDER);
    client.export_integration_package_from_raw(&package_id, &raw, &base_abs)?;

    // Sync metadata, ignore template, .gitignore.
    let meta = SyncMetadata {
        schema_version: 1,
        profile_id: profile.id.clone(),
        cpi_tenant_levels: profile.cpi_tenant_levels,
        package_id: package_id.clone(),
        package_name: pkg.name.clone(),
        base_folder: DEFAULT_BASE_FOLDER.to_string(),
        git_remote: remote.clone(),
        git_provider: provider_name.to_string(),
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    meta.validate_required()?;
    let meta_json = serde_json::to_vec_pretty(&meta)?;
    atomic_write_file(&dest.join(MARKER_DIR).join("package.json"), &meta_json)?;
    ensure_ignore_file(&dest)?;
    ensure_repo_gitignore(&dest)?;

    // Init transport record: completed, full inventory.
    let (transport_id, created_at) = new_transport_ids(Utc::now());
    write_init_transport(
        &dest,
        &meta.base_folder,
        &package_id,
        TenantEnv::Dev,
        "dev",
        &transport_id,
        &created_at,
    )?;

    init_git_repo(&dest, &remote, &transport_id)?;

    tracing::info!(dir = %dest.display(), remote = %remote, branch = "dev", "sync init completed");
    Ok(InitOutcome {
        package_id,
        package_name: pkg.name,
        remote,
        branch: "dev",
        dir: dest,
    })
}

fn validate_package_id(id: &str) -> Result<(), SyncError> {
    if id.is_empty() {
        return Err(SyncError::InvalidPackageId("packageId is required".into()));
    }
    if id.chars().any(char::is_whitespace) {
        return Err(SyncError::InvalidPackageId(
            "packageId must not contain whitespace".into(),
        ));
    }
    if id.contains('/') || id.contains('\\') {
        return Err(SyncError::InvalidPackageId(
            "packageId must not contain path separators".into(),
        ));
    }
    if id.len() > 128 {
        return Err(SyncError::InvalidPackageId(
            "packageId is too long (max 128 characters)".into(),
        ));
    }
    Ok(())
}

fn resolve_destination(
    cwd: &Path,
    parent: Option<&Path>,
    package_id: &str,
) -> Result<PathBuf, SyncError> {
    match parent {
        None => Ok(cwd.join(package_id)),
        Some(dir) => {
            let parent_abs = if dir.is_absolute() {
                dir.to_path_buf()
            } else {
                cwd.join(dir)
            };
            match std::fs::metadata(&parent_abs) {
                Ok(meta) if meta.is_dir() => Ok(parent_abs.join(package_id)),
                Ok(_) => Err(SyncError::ParentNotADirectory(
                    parent_abs.display().to_string(),
                )),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                    SyncError::ParentDirNotFound(parent_abs.display().to_string()),
                ),
                Err(e) => Err(io_err(&parent_abs, e)),
            }
        }
    }
}

fn ensure_empty_dir(dir: &Path) -> Result<(), SyncError> {
    match std::fs::metadata(dir) {
        Ok(meta) => {
            if !meta.is_dir() {
                return Err(SyncError::DestinationNotADirectory(
                    dir.display().to_string(),
                ));
            }
            let mut entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
            if entries.next().is_some() {
                return Err(SyncError::DestinationNotEmpty(dir.display().to_string()));
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))
        }
        Err(e) => Err(io_err(dir, e)),
    }
}

/// Seed `.gitignore` with the default lines, appending missing ones to an
/// existing file.
fn ensure_repo_gitignore(dir: &Path) -> Result<(), SyncError> {
    let path = dir.join(".gitignore");
    let default_lines = [".DS_Store", "*.log"];

    let mut content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let content = format!("{}\n", default_lines.join("\n"));
            atomic_write_file(&path, content.as_bytes())?;
            return Ok(());
        }
        Err(e) => return Err(io_err(&path, e)),
    };

    for line in default_lines {
        if content.contains(line) {
            continue;
        }
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(line);
        content.push('\n');
    }
    atomic_write_file(&path, content.as_bytes())?;
    Ok(())
}

fn init_git_repo(dir: &Path, remote: &str, transport_id: &str) -> Result<(), SyncError> {
    GitDriver::ensure_available()?;
    let git = GitDriver::new(dir);
    git.init_repo()?;
    // Fallback identity so commits succeed in clean environments.
    let _ = git.set_config("user.email", "iflowkit@local");
    let _ = git.set_config("user.name", "iFlowKit CLI");
    git.run(&["checkout", "-b", "dev"])?;

    // 1) contents commit (content folder only)
    let contents_msg =
        build_transport_commit_message(transport_id, TransportType::Init, "contents", "");
    git.commit_pathspec(&contents_msg, DEFAULT_BASE_FOLDER)?;

    // 2) logs commit (everything outside the content folder, incl. .iflowkit)
    git.run(&["add", "-A"])?;
    let _ = git.run(&["reset", "HEAD", "--", DEFAULT_BASE_FOLDER]);
    let _ = git.run(&["add", "-f", "--", MARKER_DIR]);
    let staged = git
        .output(&["diff", "--cached", "--name-only"])
        .unwrap_or_default();
    if !staged.is_empty() {
        let logs_msg =
            build_transport_commit_message(transport_id, TransportType::Init, "logs", "");
        git.commit_staged(&logs_msg)?;
    }

    git.add_remote_origin(remote)?;
    git.push("dev", true)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn package_id_validation() {
        assert!(validate_package_id("com.example.pkg").is_ok());
        assert!(validate_package_id("").is_err());
        assert!(validate_package_id("has space").is_err());
        assert!(validate_package_id("a/b").is_err());
        assert!(validate_package_id("a\\b").is_err());
        assert!(validate_package_id(&"x".repeat(129)).is_err());
    }

    #[test]
    fn destination_resolution() {
        let tmp = TempDir::new().unwrap();
        let cwd = tmp.path();

        assert_eq!(
            resolve_destination(cwd, None, "pkg").unwrap(),
            cwd.join("pkg")
        );

        let parent = cwd.join("repos");
        fs::create_dir_all(&parent).unwrap();
        assert_eq!(
            resolve_destination(cwd, Some(Path::new("repos")), "pkg").unwrap(),
            parent.join("pkg")
        );

        let err = resolve_destination(cwd, Some(Path::new("missing")), "pkg").unwrap_err();
        assert!(err.to_string().contains("--dir path does not exist"));

        let file = cwd.join("afile");
        fs::write(&file, "x").unwrap();
        let err = resolve_destination(cwd, Some(&file), "pkg").unwrap_err();
        assert!(err.to_string().contains("--dir is not a directory"));
    }

    #[test]
    fn empty_dir_enforcement() {
        let tmp = TempDir::new().unwrap();

        // Nonexistent: created.
        let fresh = tmp.path().join("fresh");
        ensure_empty_dir(&fresh).unwrap();
        assert!(fresh.is_dir());

        // Existing empty: ok.
        ensure_empty_dir(&fresh).unwrap();

        // Existing non-empty: rejected.
        fs::write(fresh.join("file"), "x").unwrap();
        let err = ensure_empty_dir(&fresh).unwrap_err();
        assert!(err.to_string().contains("not empty"));

        // Existing file: rejected.
        let file = tmp.path().join("afile");
        fs::write(&file, "x").unwrap();
        assert!(ensure_empty_dir(&file).is_err());
    }

    #[test]
    fn gitignore_seeding_and_appending() {
        let tmp = TempDir::new().unwrap();
        ensure_repo_gitignore(tmp.path()).unwrap();
        let content = fs::read_to_string(tmp.path().join(".gitignore")).unwrap();
        assert!(content.contains(".DS_Store"));
        assert!(content.contains("*.log"));

        // Existing file: missing defaults are appended, the rest kept.
        fs::write(tmp.path().join(".gitignore"), "node_modules\n*.log").unwrap();
        ensure_repo_gitignore(tmp.path()).unwrap();
        let content = fs::read_to_string(tmp.path().join(".gitignore")).unwrap();
        assert!(content.starts_with("node_modules\n"));
        assert!(content.contains(".DS_Store"));
        assert_eq!(content.matches("*.log").count(), 1);
    }
}
