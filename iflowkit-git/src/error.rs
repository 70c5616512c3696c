//! Error types for iflowkit-git.

use thiserror::Error;

/// All errors that can arise from git subprocess operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A git command exited non-zero; carries the command line for diagnostics.
    #[error("git {command} failed: {output}")]
    Command { command: String, output: String },

    /// The git executable could not be spawned at all.
    #[error("git executable not found in PATH")]
    GitNotFound,

    /// `rev-parse --abbrev-ref HEAD` produced nothing usable.
    #[error("unable to determine current branch")]
    NoCurrentBranch,

    /// Local and remote histories both contain exclusive commits.
    #[error("local branch diverged from {remote_ref} (ahead={ahead}, behind={behind})")]
    Diverged {
        remote_ref: String,
        ahead: u32,
        behind: u32,
    },

    /// A branch argument was empty.
    #[error("branch is required")]
    BranchRequired,

    /// A ref could not be resolved to a commit.
    #[error("cannot resolve '{reference}' to a commit")]
    UnresolvedRef { reference: String },
}
