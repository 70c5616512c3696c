//! `iflowkit sync pull [--to dev|qas|prd] [--message <m>]`

use std::path::Path;

use anyhow::Result;
use clap::Args;

use iflowkit_sync::engine::pull::{self, PullOptions, PullOutcome};
use iflowkit_sync::EngineContext;

use crate::TenantArg;

/// Refresh the local repo from the mapped CPI tenant (env branches only).
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Confirm target tenant (required for prd).
    #[arg(long, value_name = "ENV")]
    pub to: Option<TenantArg>,

    /// Optional message appended to generated commit messages.
    #[arg(long, default_value = "")]
    pub message: String,
}

impl PullArgs {
    pub fn run(self, ctx: &EngineContext, cwd: &Path) -> Result<()> {
        let outcome = pull::run(
            ctx,
            cwd,
            &PullOptions {
                to: self.to.map(Into::into),
                message: self.message.trim().to_string(),
            },
        )?;

        match outcome {
            PullOutcome::UpToDate { tenant } => {
                println!(
                    "Already up to date with CPI {}; no changes to push.",
                    tenant.display_upper()
                );
            }
            PullOutcome::Completed {
                tenant,
                branch,
                changed,
                deleted,
                record_path,
                stashed,
            } => {
                if let Some(count) = stashed {
                    println!(
                        "Stashed local changes ({count} paths). You can restore with: git stash list / git stash pop"
                    );
                }
                println!(
                    "Sync pull completed. CPI {} state exported and pushed to origin/{}. Deleted {} artifact(s), changed {} artifact(s). Transport record: {}",
                    tenant.display_upper(),
                    branch,
                    deleted,
                    changed,
                    record_path
                );
            }
        }
        Ok(())
    }
}
