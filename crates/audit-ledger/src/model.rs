use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, SubsecRound, Utc};
use fleetguard_core_types::{CompanyId, EntityId, Principal, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::LedgerError;

macro_rules! actions {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Closed set of audited verbs. New verbs are additive.
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum AuditAction {
            $($variant),+
        }

        impl AuditAction {
            pub const ALL: &'static [AuditAction] = &[$(AuditAction::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(AuditAction::$variant => $name),+
                }
            }
        }
    };
}

actions! {
    InspectionCreated => "INSPECTION_CREATED",
    InspectionUpdated => "INSPECTION_UPDATED",
    DefectCreated => "DEFECT_CREATED",
    DefectAssigned => "DEFECT_ASSIGNED",
    DefectRectified => "DEFECT_RECTIFIED",
    DefectVerified => "DEFECT_VERIFIED",
    DefectClosed => "DEFECT_CLOSED",
    UserCreated => "USER_CREATED",
    UserUpdated => "USER_UPDATED",
    UserDeleted => "USER_DELETED",
    VehicleCreated => "VEHICLE_CREATED",
    VehicleUpdated => "VEHICLE_UPDATED",
    VehicleDeleted => "VEHICLE_DELETED",
    ReminderCreated => "REMINDER_CREATED",
    ReminderUpdated => "REMINDER_UPDATED",
    ReminderCompleted => "REMINDER_COMPLETED",
    TimesheetCreated => "TIMESHEET_CREATED",
    TimesheetApproved => "TIMESHEET_APPROVED",
    TimesheetRejected => "TIMESHEET_REJECTED",
    RectificationCreated => "RECTIFICATION_CREATED",
    PartsUsed => "PARTS_USED",
    ReportGenerated => "REPORT_GENERATED",
    ComplianceReportGenerated => "COMPLIANCE_REPORT_GENERATED",
    AuditLogExported => "AUDIT_LOG_EXPORTED",
    Login => "LOGIN",
    Logout => "LOGOUT",
}

impl AuditAction {
    pub fn parse(raw: &str) -> Option<AuditAction> {
        let raw = raw.trim();
        AuditAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == raw)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::parse(s).ok_or_else(|| LedgerError::Invalid(format!("unknown action: {s}")))
    }
}

/// One persisted link of a tenant's chain. Never updated once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub changes: Value,
    pub previous_hash: Option<String>,
    pub current_hash: String,
}

/// What the caller wants recorded. Id, timestamp and hashes are assigned
/// by the ledger.
#[derive(Clone, Debug, PartialEq)]
pub struct AuditDraft {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: EntityId,
    pub changes: Value,
    pub timestamp: Option<DateTime<Utc>>,
}

impl AuditDraft {
    pub fn new(
        company_id: impl Into<CompanyId>,
        user_id: impl Into<UserId>,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl Into<EntityId>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            user_id: user_id.into(),
            action,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            changes: Value::Null,
            timestamp: None,
        }
    }

    /// Draft attributed to `principal` inside the principal's own tenant.
    pub fn by(
        principal: &Principal,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl Into<EntityId>,
    ) -> Self {
        Self::new(
            principal.company_id,
            principal.id,
            action,
            entity_type,
            entity_id,
        )
    }

    pub fn changes(mut self, changes: Value) -> Self {
        self.changes = changes;
        self
    }

    /// Pins the entry timestamp instead of taking the commit-time clock.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Commit timestamp at millisecond precision. Instants whose RFC 3339
    /// form needs more than four year digits could not be read back.
    pub(crate) fn resolved_timestamp(&self) -> Result<DateTime<Utc>, LedgerError> {
        let timestamp = self.timestamp.unwrap_or_else(Utc::now).trunc_subsecs(3);
        if !has_four_digit_year(&timestamp) {
            return Err(LedgerError::Invalid(format!(
                "timestamp {timestamp} is outside years 0000-9999"
            )));
        }
        Ok(timestamp)
    }
}

pub(crate) fn has_four_digit_year(timestamp: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&timestamp.year())
}

/// A business write committed together with an audit entry.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordWrite {
    Put {
        table: String,
        id: String,
        value: Value,
    },
    Delete {
        table: String,
        id: String,
    },
}

impl RecordWrite {
    pub fn put(table: impl Into<String>, id: impl Into<String>, value: Value) -> Self {
        RecordWrite::Put {
            table: table.into(),
            id: id.into(),
            value,
        }
    }

    pub fn delete(table: impl Into<String>, id: impl Into<String>) -> Self {
        RecordWrite::Delete {
            table: table.into(),
            id: id.into(),
        }
    }
}

/// Reporting filter. Results are always ordered by ascending id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogFilter {
    pub company_id: CompanyId,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub action: Option<AuditAction>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AuditLogFilter {
    pub fn company(company_id: impl Into<CompanyId>) -> Self {
        Self {
            company_id: company_id.into(),
            entity_type: None,
            entity_id: None,
            user_id: None,
            action: None,
            start_date: None,
            end_date: None,
            limit: None,
        }
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn entity_id(mut self, entity_id: impl Into<EntityId>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<UserId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// `start_date` rounded up to whole milliseconds, the precision entries
    /// are stored at.
    pub fn lower_bound(&self) -> Option<DateTime<Utc>> {
        self.start_date.map(|start| {
            let truncated = start.trunc_subsecs(3);
            if truncated < start {
                truncated
                    .checked_add_signed(Duration::milliseconds(1))
                    .unwrap_or(start)
            } else {
                truncated
            }
        })
    }

    /// `end_date` truncated to whole milliseconds.
    pub fn upper_bound(&self) -> Option<DateTime<Utc>> {
        self.end_date.map(|end| end.trunc_subsecs(3))
    }

    /// Date bounds are inclusive on both ends.
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        entry.company_id == self.company_id
            && self
                .entity_type
                .as_ref()
                .map_or(true, |t| &entry.entity_type == t)
            && self.entity_id.map_or(true, |id| entry.entity_id == id)
            && self.user_id.map_or(true, |id| entry.user_id == id)
            && self.action.map_or(true, |a| entry.action == a)
            && self.lower_bound().map_or(true, |s| entry.timestamp >= s)
            && self.upper_bound().map_or(true, |e| entry.timestamp <= e)
    }
}

/// Entries of one tenant that share a previous hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkGroup {
    pub previous_hash: Option<String>,
    pub log_ids: Vec<i64>,
}

/// Id and hash of the newest entry of a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainTail {
    pub id: i64,
    pub hash: String,
}

impl From<&AuditLogEntry> for ChainTail {
    fn from(entry: &AuditLogEntry) -> Self {
        Self {
            id: entry.id,
            hash: entry.current_hash.clone(),
        }
    }
}
