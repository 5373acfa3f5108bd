use std::process::ExitCode;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use fleetguard_audit_ledger::{format_timestamp, AuditAction, AuditLogEntry, AuditLogFilter};
use fleetguard_core_types::{CompanyId, EntityId, UserId};

use crate::errors::FleetGuardError;

use super::context::CliContext;
use super::output::emit;
use super::values::{parse_action, parse_timestamp};

#[derive(Args, Clone, Debug)]
pub struct LogsArgs {
    #[arg(long)]
    pub company: i64,

    #[arg(long)]
    pub entity_type: Option<String>,

    #[arg(long)]
    pub entity_id: Option<i64>,

    #[arg(long)]
    pub user: Option<i64>,

    #[arg(long, value_parser = parse_action)]
    pub action: Option<AuditAction>,

    /// Earliest timestamp, inclusive (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    pub since: Option<DateTime<Utc>>,

    /// Latest timestamp, inclusive (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    pub until: Option<DateTime<Utc>>,

    #[arg(long)]
    pub limit: Option<usize>,
}

impl LogsArgs {
    pub fn filter(&self) -> AuditLogFilter {
        let mut filter = AuditLogFilter::company(CompanyId(self.company));
        filter.entity_type = self.entity_type.clone();
        filter.entity_id = self.entity_id.map(EntityId);
        filter.user_id = self.user.map(UserId);
        filter.action = self.action;
        filter.start_date = self.since;
        filter.end_date = self.until;
        filter.limit = self.limit;
        filter
    }
}

fn human_line(entry: &AuditLogEntry) -> String {
    format!(
        "#{:<6} {}  user {:<6} {:<28} {}/{}  {}",
        entry.id,
        format_timestamp(&entry.timestamp),
        entry.user_id,
        entry.action,
        entry.entity_type,
        entry.entity_id,
        &entry.current_hash[..entry.current_hash.len().min(12)]
    )
}

pub async fn cmd_logs(args: LogsArgs, ctx: &CliContext) -> Result<ExitCode> {
    if let (Some(since), Some(until)) = (args.since, args.until) {
        if since > until {
            return Err(FleetGuardError::validation(
                "Invalid date range",
                format!("--since {since} is after --until {until}"),
            )
            .into());
        }
    }

    let app = ctx.app_context().await?;
    let entries = app
        .ledger()
        .get_audit_logs(&args.filter())
        .await
        .map_err(FleetGuardError::from)?;

    emit(ctx.output(), &entries, || {
        if entries.is_empty() {
            return format!("No audit entries for company {}", args.company);
        }
        entries.iter().map(human_line).collect::<Vec<_>>().join("\n")
    })?;
    Ok(ExitCode::SUCCESS)
}
