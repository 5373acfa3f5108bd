use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use fleetguard_audit_ledger::{format_timestamp, AuditAction, AuditDraft};
use fleetguard_core_types::{CompanyId, EntityId, UserId};
use serde_json::Value;
use tracing::info;

use crate::errors::FleetGuardError;

use super::context::CliContext;
use super::output::emit;
use super::values::{parse_action, parse_json};

#[derive(Args, Clone, Debug)]
pub struct AppendArgs {
    /// Tenant whose chain receives the entry
    #[arg(long)]
    pub company: i64,

    /// Acting user
    #[arg(long)]
    pub user: i64,

    /// Audited verb, e.g. DEFECT_CREATED
    #[arg(long, value_parser = parse_action)]
    pub action: AuditAction,

    #[arg(long)]
    pub entity_type: String,

    #[arg(long)]
    pub entity_id: i64,

    /// JSON document describing the change
    #[arg(long, value_parser = parse_json)]
    pub changes: Option<Value>,
}

pub async fn cmd_append(args: AppendArgs, ctx: &CliContext) -> Result<ExitCode> {
    if args.entity_type.trim().is_empty() {
        return Err(FleetGuardError::validation(
            "Entity type is required",
            "--entity-type must not be blank",
        )
        .into());
    }

    let app = ctx.app_context().await?;
    let draft = AuditDraft::new(
        CompanyId(args.company),
        UserId(args.user),
        args.action,
        args.entity_type,
        EntityId(args.entity_id),
    )
    .changes(args.changes.unwrap_or(Value::Null));
    let entry = app
        .ledger()
        .append(draft)
        .await
        .map_err(FleetGuardError::from)?;
    info!(company = %entry.company_id, id = entry.id, "audit entry recorded");

    emit(ctx.output(), &entry, || {
        format!(
            "Recorded entry #{} for company {}: {} {}/{} at {}\n  hash {}",
            entry.id,
            entry.company_id,
            entry.action,
            entry.entity_type,
            entry.entity_id,
            format_timestamp(&entry.timestamp),
            entry.current_hash
        )
    })?;
    Ok(ExitCode::SUCCESS)
}
