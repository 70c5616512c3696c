//! iflowkit — synchronize SAP CPI Integration Packages with Git.
//!
//! # Usage
//!
//! ```text
//! iflowkit sync init --id <packageId> [--dir <parent>]
//! iflowkit sync pull [--to dev|qas|prd] [--message <m>]
//! iflowkit sync push [--to dev|qas|prd] [--message <m>]
//! iflowkit sync deliver --to qas|prd [--message <m>]
//! iflowkit sync compare --to qas|prd
//! iflowkit sync deploy status [--env dev|qas|prd] [--transport <id>]
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{
    compare::CompareArgs, deliver::DeliverArgs, deploy::DeployCommand, init::InitArgs,
    pull::PullArgs, push::PushArgs,
};
use iflowkit_core::store::Paths;
use iflowkit_core::types::TenantEnv;
use iflowkit_sync::EngineContext;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "iflowkit",
    version,
    about = "Synchronize SAP CPI Integration Packages with Git across a tiered landscape",
    long_about = None,
)]
struct Cli {
    /// Profile id (overrides the active profile).
    #[arg(long, global = true, value_name = "ID")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize an Integration Package repository with Git and CPI.
    Sync {
        #[command(subcommand)]
        command: SyncCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SyncCommand {
    /// Initialize a Git repository for a CPI Integration Package and export DEV artifacts.
    Init(InitArgs),

    /// Refresh the local repo from CPI and push the tenant state to the current branch.
    Pull(PullArgs),

    /// Push local changes to git and update the mapped CPI tenant.
    Push(PushArgs),

    /// Promote changes between environment branches and update the target tenant.
    Deliver(DeliverArgs),

    /// Show IntegrationPackage differences between the current branch and an environment branch.
    Compare(CompareArgs),

    /// Inspect deployment state for recorded transports.
    Deploy {
        #[command(subcommand)]
        command: DeployCommand,
    },
}

// ---------------------------------------------------------------------------
// Shared tenant argument — parsed from CLI strings, converts to core type
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse [`TenantEnv`] from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct TenantArg(pub TenantEnv);

impl FromStr for TenantArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TenantEnv::from_str(s)
            .map(Self)
            .map_err(|_| format!("invalid environment '{s}' (allowed: dev|qas|prd)"))
    }
}

impl fmt::Display for TenantArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<TenantArg> for TenantEnv {
    fn from(t: TenantArg) -> Self {
        t.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = Paths::new().context("cannot locate the iflowkit config directory")?;
    let ctx = EngineContext::new(paths, cli.profile.clone());
    let cwd = std::env::current_dir().context("cannot determine working directory")?;

    match cli.command {
        Commands::Sync { command } => match command {
            SyncCommand::Init(args) => args.run(&ctx, &cwd),
            SyncCommand::Pull(args) => args.run(&ctx, &cwd),
            SyncCommand::Push(args) => args.run(&ctx, &cwd),
            SyncCommand::Deliver(args) => args.run(&ctx, &cwd),
            SyncCommand::Compare(args) => args.run(&cwd),
            SyncCommand::Deploy { command } => commands::deploy::run(command, &ctx, &cwd),
        },
    }
}
