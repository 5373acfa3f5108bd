use std::process::ExitCode;

use anyhow::Result;

use super::append::cmd_append;
use super::check::cmd_check;
use super::commands::Commands;
use super::context::CliContext;
use super::env::CliArgs;
use super::info::cmd_info;
use super::logs::cmd_logs;
use super::roles::cmd_roles;
use super::verify::cmd_verify;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<ExitCode> {
    match cli.command.clone() {
        Commands::Roles(args) => cmd_roles(args, ctx),
        Commands::Check(args) => cmd_check(args, ctx),
        Commands::Append(args) => cmd_append(args, ctx).await,
        Commands::Logs(args) => cmd_logs(args, ctx).await,
        Commands::Verify(args) => cmd_verify(args, ctx).await,
        Commands::Info => cmd_info(ctx),
    }
}
