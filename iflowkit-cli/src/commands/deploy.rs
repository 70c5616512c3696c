//! `iflowkit sync deploy status [--env dev|qas|prd] [--transport <id>]`

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use iflowkit_core::types::TenantEnv;
use iflowkit_sync::engine::deploy_status::{self, DeployStatusOptions, DeployStatusOutcome};
use iflowkit_sync::EngineContext;

use crate::TenantArg;

#[derive(Subcommand, Debug)]
pub enum DeployCommand {
    /// List CPI deployment status for the objects of a transport record.
    Status(StatusArgs),
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Tenant environment (dev|qas|prd).
    #[arg(long, default_value = "dev", value_name = "ENV")]
    pub env: TenantArg,

    /// Transport id (defaults to the last transport of the environment).
    #[arg(long, value_name = "ID")]
    pub transport: Option<String>,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "DEPLOYED_AT")]
    deployed_at: String,
}

pub fn run(command: DeployCommand, ctx: &EngineContext, cwd: &Path) -> Result<()> {
    match command {
        DeployCommand::Status(args) => {
            let env: TenantEnv = args.env.into();
            let outcome = deploy_status::run(
                ctx,
                cwd,
                &DeployStatusOptions {
                    env,
                    transport: args.transport,
                },
            )?;

            match outcome {
                DeployStatusOutcome::NoRecords => {
                    println!("No transport records found.");
                }
                DeployStatusOutcome::NoObjects => {
                    println!("No objects recorded for this transport.");
                }
                DeployStatusOutcome::Rows(rows) => {
                    let table_rows: Vec<StatusRow> = rows
                        .into_iter()
                        .map(|r| StatusRow {
                            kind: r.kind.to_string(),
                            name: r.id,
                            status: r.status,
                            deployed_at: r.deployed_on,
                        })
                        .collect();
                    println!("{}", Table::new(table_rows).with(Style::blank()));
                }
            }
            Ok(())
        }
    }
}
