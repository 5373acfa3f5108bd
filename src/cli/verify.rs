use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use fleetguard_core_types::CompanyId;
use tracing::warn;

use crate::errors::FleetGuardError;

use super::context::CliContext;
use super::output::emit;

/// Exit status when any verified chain is invalid.
pub const INVALID_EXIT: u8 = 2;

#[derive(Args, Clone, Debug)]
pub struct VerifyArgs {
    /// Company to verify; repeat for several
    #[arg(long = "company", required = true)]
    pub companies: Vec<i64>,
}

pub async fn cmd_verify(args: VerifyArgs, ctx: &CliContext) -> Result<ExitCode> {
    let app = ctx.app_context().await?;
    let reports = app
        .verifier()
        .verify_all(args.companies.iter().copied().map(CompanyId))
        .await
        .map_err(FleetGuardError::from)?;

    for violation in reports.iter().filter_map(|report| report.violation()) {
        warn!(code = %violation.code.as_str(), "{}", violation.summary());
    }

    let render = || {
        reports
            .iter()
            .map(|report| report.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    };
    match reports.as_slice() {
        [single] => emit(ctx.output(), single, render)?,
        many => emit(ctx.output(), many, render)?,
    }

    Ok(if reports.iter().all(|report| report.is_valid) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(INVALID_EXIT)
    })
}
