//! The git subprocess driver.
//!
//! A [`GitDriver`] owns one working directory and exposes the exact
//! operations the transport engine needs. Query helpers that git treats as
//! best-effort (upstream lookup, ahead/behind counts, porcelain status)
//! degrade to empty results instead of failing the run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::GitError;

/// Typed capability object around `git` invoked in a fixed directory.
#[derive(Debug, Clone)]
pub struct GitDriver {
    dir: PathBuf,
}

impl GitDriver {
    pub fn new(dir: impl Into<PathBuf>) -> GitDriver {
        GitDriver { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fail early when git is not installed.
    pub fn ensure_available() -> Result<(), GitError> {
        match Command::new("git").arg("--version").output() {
            Ok(out) if out.status.success() => Ok(()),
            _ => Err(GitError::GitNotFound),
        }
    }

    /// Run a git command, discarding output on success.
    pub fn run(&self, args: &[&str]) -> Result<(), GitError> {
        self.output(args).map(|_| ())
    }

    /// Run a git command and return its trimmed combined output.
    pub fn output(&self, args: &[&str]) -> Result<String, GitError> {
        tracing::debug!(args = %args.join(" "), dir = %self.dir.display(), "git");
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|_| GitError::GitNotFound)?;

        let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&out.stderr);
        if !stderr.trim().is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(stderr.trim_end());
        }
        let combined = combined.trim().to_string();

        if !out.status.success() {
            return Err(GitError::Command {
                command: args.join(" "),
                output: combined,
            });
        }
        Ok(combined)
    }

    // -----------------------------------------------------------------------
    // State queries
    // -----------------------------------------------------------------------

    pub fn current_branch(&self) -> Result<String, GitError> {
        let out = self.output(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if out.is_empty() {
            return Err(GitError::NoCurrentBranch);
        }
        Ok(out)
    }

    /// The upstream tracking ref of HEAD (e.g. `origin/dev`), if configured.
    pub fn upstream_ref(&self) -> Option<String> {
        self.output(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"])
            .ok()
            .filter(|s| !s.is_empty())
    }

    pub fn remote_branch_exists(&self, branch: &str) -> bool {
        let reference = format!("refs/remotes/origin/{branch}");
        self.run(&["show-ref", "--verify", "--quiet", &reference])
            .is_ok()
    }

    pub fn local_branch_exists(&self, branch: &str) -> bool {
        let branch = branch.trim();
        if branch.is_empty() {
            return false;
        }
        let reference = format!("refs/heads/{branch}");
        self.run(&["show-ref", "--verify", "--quiet", &reference])
            .is_ok()
    }

    /// `(behind, ahead)` of `right` relative to `left` via
    /// `rev-list --left-right --count left...right`; `(0, 0)` on any failure.
    pub fn ahead_behind(&self, left: &str, right: &str) -> (u32, u32) {
        let range = format!("{left}...{right}");
        let Ok(out) = self.output(&["rev-list", "--left-right", "--count", &range]) else {
            return (0, 0);
        };
        let mut fields = out.split_whitespace();
        let behind = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
        let ahead = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
        (behind, ahead)
    }

    /// Changed paths and commits (oldest → newest) between `base_ref` and HEAD.
    ///
    /// Without a base ref, the HEAD commit stands in as the pushed commit;
    /// work branches additionally try `origin/dev..HEAD` for changed paths.
    pub fn pending_changes(
        &self,
        base_ref: Option<&str>,
        branch: &str,
    ) -> Result<(Vec<String>, Vec<String>), GitError> {
        let mut changed_paths = Vec::new();
        let mut commits = Vec::new();

        match base_ref {
            Some(base) if !base.is_empty() => {
                let range = format!("{base}..HEAD");
                changed_paths = split_lines(&self.output(&["diff", "--name-only", &range])?);
                commits = split_lines(&self.output(&["rev-list", "--reverse", &range])?);
            }
            _ => {
                if let Ok(out) = self.output(&["rev-list", "--max-count=1", "HEAD"]) {
                    commits = split_lines(&out);
                }
                if branch.starts_with("feature/") || branch.starts_with("bugfix/") {
                    if let Ok(out) = self.output(&["diff", "--name-only", "origin/dev..HEAD"]) {
                        changed_paths = split_lines(&out);
                    }
                }
            }
        }

        Ok((changed_paths, commits))
    }

    /// Sorted unique working-tree paths from `git status --porcelain`.
    ///
    /// Rename entries (`old -> new`) contribute only the new path.
    pub fn porcelain_paths(&self) -> Vec<String> {
        let Ok(out) = self.output(&["status", "--porcelain"]) else {
            return Vec::new();
        };
        let mut set = BTreeSet::new();
        for line in out.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let path = if let Some((_, new)) = line.split_once("->") {
                new.trim()
            } else if line.len() > 3 {
                line[2..].trim()
            } else {
                continue;
            };
            if !path.is_empty() {
                set.insert(path.replace('\\', "/"));
            }
        }
        set.into_iter().collect()
    }

    /// Whether the working tree or index has changes under `pathspec`.
    pub fn has_changes_in(&self, pathspec: &str) -> Result<bool, GitError> {
        let out = self.output(&["status", "--porcelain", "--", pathspec])?;
        Ok(!out.is_empty())
    }

    /// Untracked paths (`ls-files --others --exclude-standard`).
    pub fn untracked_paths(&self) -> Vec<String> {
        self.output(&["ls-files", "--others", "--exclude-standard"])
            .map(|out| split_lines(&out))
            .unwrap_or_default()
    }

    /// Tracked-vs-worktree changed paths (`diff --name-only`).
    pub fn worktree_changed_paths(&self) -> Vec<String> {
        self.output(&["diff", "--name-only"])
            .map(|out| split_lines(&out))
            .unwrap_or_default()
    }

    /// Changed paths of a committed range, optionally limited to a pathspec.
    pub fn diff_name_only(
        &self,
        range: &str,
        pathspec: Option<&str>,
    ) -> Result<Vec<String>, GitError> {
        let out = match pathspec {
            Some(p) => self.output(&["diff", "--name-only", range, "--", p])?,
            None => self.output(&["diff", "--name-only", range])?,
        };
        Ok(split_lines(&out))
    }

    /// Commits that a push of `branch` would publish, oldest → newest.
    pub fn commits_to_push(&self, branch: &str) -> Vec<String> {
        if self.remote_branch_exists(branch) {
            let range = format!("origin/{branch}..HEAD");
            self.output(&["rev-list", "--reverse", &range])
                .map(|out| split_lines(&out))
                .unwrap_or_default()
        } else {
            self.output(&["rev-list", "--max-count=1", "HEAD"])
                .map(|out| split_lines(&out))
                .unwrap_or_default()
        }
    }

    /// Commit author identity: `config user.{name,email}`, falling back to
    /// the author of HEAD.
    pub fn user_identity(&self) -> (String, String) {
        let mut name = self
            .output(&["config", "--get", "user.name"])
            .unwrap_or_default();
        let mut email = self
            .output(&["config", "--get", "user.email"])
            .unwrap_or_default();
        if name.is_empty() {
            name = self
                .output(&["log", "-1", "--pretty=format:%an"])
                .unwrap_or_default();
        }
        if email.is_empty() {
            email = self
                .output(&["log", "-1", "--pretty=format:%ae"])
                .unwrap_or_default();
        }
        (name, email)
    }

    pub fn rev_parse(&self, reference: &str) -> Result<String, GitError> {
        let out = self.output(&["rev-parse", reference])?;
        if out.is_empty() {
            return Err(GitError::UnresolvedRef {
                reference: reference.to_string(),
            });
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Fetch / checkout
    // -----------------------------------------------------------------------

    /// Best-effort `fetch origin`.
    pub fn fetch_origin(&self) {
        let _ = self.run(&["fetch", "origin"]);
    }

    /// Best-effort `fetch origin <branch>`.
    pub fn fetch_origin_branch(&self, branch: &str) {
        let _ = self.run(&["fetch", "origin", branch]);
    }

    /// Check out `branch`, creating it from `origin/<branch>` when only the
    /// remote exists, or as a new branch when neither does.
    pub fn checkout_branch(&self, branch: &str) -> Result<(), GitError> {
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(GitError::BranchRequired);
        }
        if self.local_branch_exists(branch) {
            return self.run(&["checkout", branch]);
        }
        if self.remote_branch_exists(branch) {
            let start = format!("origin/{branch}");
            return self.run(&["checkout", "-b", branch, &start]);
        }
        self.run(&["checkout", "-b", branch])
    }

    /// Fast-forward the current branch to `origin/<branch>`; error on
    /// divergence, no-op when the remote branch does not exist.
    pub fn fast_forward_from_remote(&self, branch: &str) -> Result<(), GitError> {
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(GitError::BranchRequired);
        }
        if !self.remote_branch_exists(branch) {
            return Ok(());
        }
        let remote_ref = format!("origin/{branch}");
        let (behind, ahead) = self.ahead_behind(&remote_ref, "HEAD");
        if behind > 0 && ahead > 0 {
            return Err(GitError::Diverged {
                remote_ref,
                ahead,
                behind,
            });
        }
        if behind > 0 {
            return self.run(&["merge", "--ff-only", &remote_ref]);
        }
        Ok(())
    }

    /// Fetch, check out and fast-forward `branch` in one step.
    pub fn ensure_branch_fetched_and_checked_out(&self, branch: &str) -> Result<(), GitError> {
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(GitError::BranchRequired);
        }
        self.fetch_origin_branch(branch);
        self.checkout_branch(branch)?;
        self.fast_forward_from_remote(branch)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Stage and commit everything under `pathspec`; "nothing to commit" is
    /// success.
    pub fn commit_pathspec(&self, message: &str, pathspec: &str) -> Result<(), GitError> {
        self.run(&["add", "-A", "--", pathspec])?;
        self.commit_tolerant(&["commit", "-m", message, "--", pathspec])
    }

    /// The logs commit: stage everything, un-stage the content folder,
    /// force-add `.iflowkit`, commit the remainder, then push `branch`.
    ///
    /// Used after CPI phases so that transport records always reach the
    /// remote even on failed runs.
    pub fn commit_and_push_logs(
        &self,
        branch: &str,
        content_folder: &str,
        message: &str,
    ) -> Result<(), GitError> {
        self.run(&["add", "-A"])?;
        let _ = self.run(&["reset", "HEAD", "--", content_folder]);
        let _ = self.run(&["add", "-f", "--", ".iflowkit"]);

        let staged = self.output(&["diff", "--cached", "--name-only"])?;
        if staged.is_empty() {
            return Ok(());
        }

        self.commit_tolerant(&["commit", "-m", message])?;
        self.push(branch, self.upstream_ref().is_none())
    }

    /// Commit whatever is already staged; "nothing to commit" is success.
    pub fn commit_staged(&self, message: &str) -> Result<(), GitError> {
        self.commit_tolerant(&["commit", "-m", message])
    }

    fn commit_tolerant(&self, args: &[&str]) -> Result<(), GitError> {
        match self.run(args) {
            Ok(()) => Ok(()),
            Err(GitError::Command { output, .. }) if output.contains("nothing to commit") => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn push(&self, branch: &str, set_upstream: bool) -> Result<(), GitError> {
        if set_upstream {
            self.run(&["push", "-u", "origin", branch])
        } else {
            self.run(&["push", "origin", branch])
        }
    }

    /// `merge --no-ff -m <message> <source>`; aborts the merge before
    /// surfacing a conflict so the user is not left mid-merge.
    pub fn merge_no_ff(&self, message: &str, source: &str) -> Result<(), GitError> {
        match self.run(&["merge", "--no-ff", "-m", message, source]) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = self.run(&["merge", "--abort"]);
                Err(e)
            }
        }
    }

    pub fn stash_push(&self, message: &str) -> Result<(), GitError> {
        self.run(&["stash", "push", "-u", "-m", message])
    }

    pub fn init_repo(&self) -> Result<(), GitError> {
        self.run(&["init"])
    }

    pub fn set_config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run(&["config", key, value])
    }

    /// Add `origin`; an already-configured origin is not an error.
    pub fn add_remote_origin(&self, url: &str) -> Result<(), GitError> {
        match self.run(&["remote", "add", "origin", url]) {
            Ok(()) => Ok(()),
            Err(GitError::Command { output, .. })
                if output.contains("remote origin already exists") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Sorted unique non-empty trimmed lines.
pub(crate) fn split_lines(s: &str) -> Vec<String> {
    let set: BTreeSet<String> = s
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_sorts_and_dedupes() {
        let lines = split_lines("b\n\na\n a \nb\n");
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn split_lines_empty_input() {
        assert!(split_lines("").is_empty());
        assert!(split_lines("\n  \n").is_empty());
    }
}
