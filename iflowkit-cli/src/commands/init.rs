//! `iflowkit sync init --id <packageId> [--dir <parent>]`

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use iflowkit_sync::engine::init::{self, InitOptions};
use iflowkit_sync::EngineContext;

/// Initialize a sync repository from a CPI Integration Package.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// CPI IntegrationPackage id (e.g. com.example.cpi.email).
    #[arg(long)]
    pub id: String,

    /// Parent directory where <packageId>/ will be created (default: current directory).
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self, ctx: &EngineContext, cwd: &Path) -> Result<()> {
        let outcome = init::run(
            ctx,
            cwd,
            &InitOptions {
                package_id: self.id,
                dir: self.dir,
            },
        )?;

        println!(
            "Initialized sync repo for {} ({})",
            outcome.package_id, outcome.package_name
        );
        println!("Remote: {}", outcome.remote);
        println!("Branch: {}", outcome.branch);
        println!("Directory: {}", outcome.dir.display());
        Ok(())
    }
}
