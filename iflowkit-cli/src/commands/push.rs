//! `iflowkit sync push [--to dev|qas|prd] [--message <m>]`

use std::path::Path;

use anyhow::Result;
use clap::Args;

use iflowkit_sync::engine::push::{self, PushOptions, PushOutcome};
use iflowkit_sync::EngineContext;

use crate::TenantArg;

/// Push local changes to git and update the mapped CPI tenant.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Confirm target tenant (required for prd).
    #[arg(long, value_name = "ENV")]
    pub to: Option<TenantArg>,

    /// Optional message appended to generated commit messages.
    #[arg(long, default_value = "")]
    pub message: String,
}

impl PushArgs {
    pub fn run(self, ctx: &EngineContext, cwd: &Path) -> Result<()> {
        let outcome = push::run(
            ctx,
            cwd,
            &PushOptions {
                to: self.to.map(Into::into),
                message: self.message.trim().to_string(),
            },
        )?;

        match outcome {
            PushOutcome::NoChanges => {
                println!("No changes detected; nothing to do.");
            }
            PushOutcome::GitOnly => {
                println!(
                    "Git push completed. No CPI artifact changes detected under IntegrationPackage/."
                );
            }
            PushOutcome::Completed {
                branch,
                tenant,
                deleted,
                updated,
                deployed,
                record_path,
            } => {
                println!(
                    "Sync push completed on branch {}. Git pushed (if needed). CPI {} deleted {} artifact(s), updated {} artifact(s) and deployed {} artifact(s). Transport record: {}",
                    branch,
                    tenant.display_upper(),
                    deleted,
                    updated,
                    deployed,
                    record_path
                );
            }
        }
        Ok(())
    }
}
