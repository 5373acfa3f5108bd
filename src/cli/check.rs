use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use fleetguard_authz_gate::prelude::*;
use fleetguard_authz_gate::DenialBody;
use fleetguard_core_types::{CompanyId, UserId};
use serde::Serialize;
use tracing::debug;

use super::context::CliContext;
use super::output::emit;
use super::values::{parse_permission, parse_role};

/// Exit status when the check is denied.
pub const DENIED_EXIT: u8 = 2;

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    /// Role of the principal
    #[arg(long, value_parser = parse_role)]
    pub role: Role,

    /// Required permission; repeat to require several
    #[arg(long = "permission", value_parser = parse_permission, required = true)]
    pub permissions: Vec<Permission>,

    /// With several permissions, one of them is enough
    #[arg(long)]
    pub any: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckOutcome {
    allowed: bool,
    role: Role,
    permissions: Vec<Permission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    denial: Option<DenialBody>,
}

pub fn guard_for(args: &CheckArgs) -> GuardChain {
    let chain = GuardChain::new();
    match args.permissions.as_slice() {
        [single] => chain.with(require_permission(*single)),
        many if args.any => chain.with(require_any_permission(many.to_vec())),
        many => chain.with(require_all_permissions(many.to_vec())),
    }
}

pub fn cmd_check(args: CheckArgs, ctx: &CliContext) -> Result<ExitCode> {
    let principal = Principal::new(UserId(0), CompanyId(0), args.role);
    let cx = GateContext::new(principal).with_request_id("cli-check");
    let verdict = guard_for(&args).check(&cx);
    debug!(role = %args.role, allowed = verdict.is_ok(), "permission check");

    let outcome = match verdict {
        Ok(()) => CheckOutcome {
            allowed: true,
            role: args.role,
            permissions: args.permissions,
            status: None,
            denial: None,
        },
        Err(rejection) => CheckOutcome {
            allowed: false,
            role: args.role,
            permissions: args.permissions,
            status: Some(rejection.status()),
            denial: Some(rejection.body().clone()),
        },
    };

    emit(ctx.output(), &outcome, || {
        let names = outcome
            .permissions
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        match &outcome.denial {
            None => format!("ALLOWED: {} holds {}", outcome.role, names),
            Some(denial) => format!(
                "DENIED ({}): {} lacks {}: {}",
                outcome.status.unwrap_or(403),
                outcome.role,
                names,
                denial.message
            ),
        }
    })?;

    Ok(if outcome.allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(DENIED_EXIT)
    })
}
