//! `iflowkit sync compare --to qas|prd`

use std::path::Path;

use anyhow::Result;
use clap::Args;

use iflowkit_sync::engine::compare_branch::{self, CompareOptions};

use crate::TenantArg;

/// Show IntegrationPackage differences between the current branch and an
/// environment branch on origin.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Target environment branch (qas|prd).
    #[arg(long, value_name = "ENV")]
    pub to: TenantArg,
}

impl CompareArgs {
    pub fn run(self, cwd: &Path) -> Result<()> {
        let outcome = compare_branch::run(cwd, &CompareOptions { to: self.to.into() })?;

        if outcome.objects.is_empty() {
            println!(
                "No IntegrationPackage differences between {} and {} (after applying .iflowkit/ignore).",
                outcome.branch, outcome.target_ref
            );
            return Ok(());
        }

        println!(
            "IntegrationPackage differences (after applying .iflowkit/ignore): {} vs {}",
            outcome.branch, outcome.target_ref
        );
        for object in &outcome.objects {
            println!("{} - {}", object.kind, object.id);
        }
        Ok(())
    }
}
