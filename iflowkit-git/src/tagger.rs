//! Transport tags: `<transportId>_<branch>` on the tip of an env branch.

use crate::driver::GitDriver;
use crate::error::GitError;

/// Build the tag name for a transport on a branch.
///
/// The branch part is normalized: common ref prefixes and a leading
/// `origin/` are stripped, `/` and whitespace become `-`.
pub fn transport_tag_name(transport_id: &str, branch: &str) -> String {
    let mut b = branch.trim();
    b = b.strip_prefix("refs/heads/").unwrap_or(b);
    b = b.strip_prefix("refs/remotes/").unwrap_or(b);
    b = b.strip_prefix("origin/").unwrap_or(b);
    let normalized: String = b
        .chars()
        .map(|c| if c == '/' || c.is_whitespace() { '-' } else { c })
        .collect();
    let normalized = normalized.trim_matches('-');
    let branch_part = if normalized.is_empty() {
        "unknown"
    } else {
        normalized
    };
    format!("{}_{}", transport_id.trim(), branch_part)
}

/// Creates and pushes transport tags idempotently.
pub struct GitTagger<'a> {
    git: &'a GitDriver,
    remote: &'static str,
}

impl<'a> GitTagger<'a> {
    pub fn new(git: &'a GitDriver) -> GitTagger<'a> {
        GitTagger {
            git,
            remote: "origin",
        }
    }

    /// Tag the tip of `branch` with `<transportId>_<branch>` and push the tag.
    ///
    /// An existing local tag is pushed anyway; a push rejected because the
    /// remote already has the tag is treated as success.
    pub fn tag_branch_with_transport_id(
        &self,
        branch: &str,
        transport_id: &str,
    ) -> Result<(), GitError> {
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(GitError::BranchRequired);
        }
        let transport_id = transport_id.trim();
        if transport_id.is_empty() {
            return Err(GitError::UnresolvedRef {
                reference: "<empty transport id>".to_string(),
            });
        }

        let tag_name = transport_tag_name(transport_id, branch);
        let commit = self.git.rev_parse(branch)?;

        if !self.local_tag_exists(&tag_name) {
            tracing::info!(tag = %tag_name, branch, "creating git tag");
            if let Err(e) = self.git.run(&["tag", &tag_name, &commit]) {
                // Lost a race against another create; fine as long as it exists now.
                if !self.local_tag_exists(&tag_name) {
                    return Err(e);
                }
            }
        }

        tracing::info!(tag = %tag_name, remote = self.remote, "pushing git tag");
        if let Err(e) = self.git.run(&["push", self.remote, &tag_name]) {
            if self.remote_tag_exists(&tag_name) {
                tracing::info!(tag = %tag_name, "tag already exists on remote; continuing");
                return Ok(());
            }
            return Err(e);
        }
        Ok(())
    }

    fn local_tag_exists(&self, tag: &str) -> bool {
        self.git
            .output(&["tag", "-l", tag])
            .map(|out| out == tag)
            .unwrap_or(false)
    }

    fn remote_tag_exists(&self, tag: &str) -> bool {
        self.git
            .output(&["ls-remote", "--tags", self.remote, tag])
            .map(|out| !out.is_empty())
            .unwrap_or(false)
    }
}
