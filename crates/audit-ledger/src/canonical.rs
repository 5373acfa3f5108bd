//! Deterministic JSON used as hash input.
//!
//! Object keys are sorted bytewise, no whitespace is emitted and strings use
//! standard JSON escaping. Numbers keep serde_json's shortest representation,
//! so a value read back from storage re-encodes to the same bytes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::errors::LedgerError;
use crate::model::{AuditAction, AuditLogEntry};
use fleetguard_core_types::{CompanyId, EntityId, UserId};

pub fn canonicalize_to_string(value: &Value) -> Result<String, LedgerError> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String) -> Result<(), LedgerError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(num) => out.push_str(&num.to_string()),
        Value::String(s) => write_str(s, out)?,
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (idx, (key, value)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_str(key, out)?;
                out.push(':');
                write_value(value, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_str(s: &str, out: &mut String) -> Result<(), LedgerError> {
    let escaped = serde_json::to_string(s)
        .map_err(|err| LedgerError::Encoding(format!("string escaping failed: {err}")))?;
    out.push_str(&escaped);
    Ok(())
}

/// RFC 3339, UTC, millisecond precision, `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The fields of an entry that are covered by its hash.
#[derive(Clone, Copy, Debug)]
pub struct HashedFields<'a> {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub action: AuditAction,
    pub entity_type: &'a str,
    pub entity_id: EntityId,
    pub timestamp: &'a DateTime<Utc>,
    pub changes: &'a Value,
}

impl<'a> From<&'a AuditLogEntry> for HashedFields<'a> {
    fn from(entry: &'a AuditLogEntry) -> Self {
        Self {
            company_id: entry.company_id,
            user_id: entry.user_id,
            action: entry.action,
            entity_type: &entry.entity_type,
            entity_id: entry.entity_id,
            timestamp: &entry.timestamp,
            changes: &entry.changes,
        }
    }
}

impl HashedFields<'_> {
    pub fn to_value(&self) -> Value {
        json!({
            "companyId": self.company_id.get(),
            "userId": self.user_id.get(),
            "action": self.action.as_str(),
            "entityType": self.entity_type,
            "entityId": self.entity_id.get(),
            "timestamp": format_timestamp(self.timestamp),
            "changes": self.changes,
        })
    }

    pub fn canonical(&self) -> Result<String, LedgerError> {
        canonicalize_to_string(&self.to_value())
    }
}
