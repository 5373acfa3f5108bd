//! `clap` value parsers for domain types.

use chrono::{DateTime, Utc};
use fleetguard_audit_ledger::AuditAction;
use fleetguard_core_types::Role;
use fleetguard_permissions::Permission;
use serde_json::Value;

fn normalize(raw: &str) -> String {
    raw.trim().replace('-', "_").to_ascii_uppercase()
}

pub fn parse_role(raw: &str) -> Result<Role, String> {
    Role::parse(&normalize(raw)).ok_or_else(|| {
        let known = Role::ALL.map(|role| role.as_str()).join(", ");
        format!("unknown role `{raw}` (expected one of {known})")
    })
}

pub fn parse_permission(raw: &str) -> Result<Permission, String> {
    Permission::parse(&normalize(raw)).ok_or_else(|| format!("unknown permission `{raw}`"))
}

pub fn parse_action(raw: &str) -> Result<AuditAction, String> {
    AuditAction::parse(&normalize(raw)).ok_or_else(|| format!("unknown audit action `{raw}`"))
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| format!("invalid RFC 3339 timestamp `{raw}`: {err}"))
}

pub fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|err| format!("invalid JSON: {err}"))
}
