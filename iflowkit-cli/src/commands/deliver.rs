//! `iflowkit sync deliver --to qas|prd [--message <m>]`

use std::path::Path;

use anyhow::Result;
use clap::Args;

use iflowkit_sync::engine::deliver::{self, DeliverOptions};
use iflowkit_sync::EngineContext;

use crate::TenantArg;

/// Promote changes between environment branches and update the target tenant.
#[derive(Args, Debug)]
pub struct DeliverArgs {
    /// Target environment (qas|prd).
    #[arg(long, value_name = "ENV")]
    pub to: TenantArg,

    /// Optional message appended to generated commit messages.
    #[arg(long, default_value = "")]
    pub message: String,
}

impl DeliverArgs {
    pub fn run(self, ctx: &EngineContext, cwd: &Path) -> Result<()> {
        let outcome = deliver::run(
            ctx,
            cwd,
            &DeliverOptions {
                to: self.to.into(),
                message: self.message.trim().to_string(),
            },
        )?;

        println!(
            "Sync deliver completed. Updated CPI {}: deleted {}, updated {}, deployed {}. Target branch: {}. Transport: {}",
            outcome.to.display_upper(),
            outcome.deleted,
            outcome.updated,
            outcome.deployed,
            outcome.target_branch,
            outcome.transport_id
        );
        Ok(())
    }
}
