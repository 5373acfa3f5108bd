use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unrecognised permission: {0}")]
    UnknownPermission(String),
}

/// Business area a permission belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionDomain {
    Inspection,
    Defect,
    User,
    Vehicle,
    Reminder,
    Report,
    AuditLog,
    Timesheet,
    Rectification,
    Parts,
    ComplianceReport,
}

impl PermissionDomain {
    pub const fn as_str(self) -> &'static str {
        match self {
            PermissionDomain::Inspection => "INSPECTION",
            PermissionDomain::Defect => "DEFECT",
            PermissionDomain::User => "USER",
            PermissionDomain::Vehicle => "VEHICLE",
            PermissionDomain::Reminder => "REMINDER",
            PermissionDomain::Report => "REPORT",
            PermissionDomain::AuditLog => "AUDIT_LOG",
            PermissionDomain::Timesheet => "TIMESHEET",
            PermissionDomain::Rectification => "RECTIFICATION",
            PermissionDomain::Parts => "PARTS",
            PermissionDomain::ComplianceReport => "COMPLIANCE_REPORT",
        }
    }
}

macro_rules! catalog {
    ($($variant:ident => ($name:literal, $domain:ident)),+ $(,)?) => {
        /// Atomic capability. The catalog is closed; roles are granted
        /// subsets of it in [`crate::table`].
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum Permission {
            $($variant),+
        }

        impl Permission {
            pub const ALL: &'static [Permission] = &[$(Permission::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Permission::$variant => $name),+
                }
            }

            pub const fn domain(self) -> PermissionDomain {
                match self {
                    $(Permission::$variant => PermissionDomain::$domain),+
                }
            }
        }
    };
}

catalog! {
    InspectionCreate => ("INSPECTION_CREATE", Inspection),
    InspectionView => ("INSPECTION_VIEW", Inspection),
    InspectionViewAll => ("INSPECTION_VIEW_ALL", Inspection),
    InspectionUpdate => ("INSPECTION_UPDATE", Inspection),
    InspectionDelete => ("INSPECTION_DELETE", Inspection),

    DefectCreate => ("DEFECT_CREATE", Defect),
    DefectView => ("DEFECT_VIEW", Defect),
    DefectViewAll => ("DEFECT_VIEW_ALL", Defect),
    DefectUpdate => ("DEFECT_UPDATE", Defect),
    DefectAssign => ("DEFECT_ASSIGN", Defect),
    DefectRectify => ("DEFECT_RECTIFY", Defect),
    DefectVerify => ("DEFECT_VERIFY", Defect),
    DefectClose => ("DEFECT_CLOSE", Defect),

    UserCreate => ("USER_CREATE", User),
    UserView => ("USER_VIEW", User),
    UserUpdate => ("USER_UPDATE", User),
    UserDelete => ("USER_DELETE", User),

    VehicleCreate => ("VEHICLE_CREATE", Vehicle),
    VehicleView => ("VEHICLE_VIEW", Vehicle),
    VehicleUpdate => ("VEHICLE_UPDATE", Vehicle),
    VehicleDelete => ("VEHICLE_DELETE", Vehicle),

    ReminderCreate => ("REMINDER_CREATE", Reminder),
    ReminderView => ("REMINDER_VIEW", Reminder),
    ReminderUpdate => ("REMINDER_UPDATE", Reminder),
    ReminderDelete => ("REMINDER_DELETE", Reminder),
    ReminderComplete => ("REMINDER_COMPLETE", Reminder),

    ReportView => ("REPORT_VIEW", Report),
    ReportGenerate => ("REPORT_GENERATE", Report),
    ReportExport => ("REPORT_EXPORT", Report),

    AuditLogView => ("AUDIT_LOG_VIEW", AuditLog),
    AuditLogExport => ("AUDIT_LOG_EXPORT", AuditLog),
    AuditLogVerify => ("AUDIT_LOG_VERIFY", AuditLog),

    TimesheetCreate => ("TIMESHEET_CREATE", Timesheet),
    TimesheetView => ("TIMESHEET_VIEW", Timesheet),
    TimesheetViewAll => ("TIMESHEET_VIEW_ALL", Timesheet),
    TimesheetApprove => ("TIMESHEET_APPROVE", Timesheet),

    RectificationCreate => ("RECTIFICATION_CREATE", Rectification),
    RectificationView => ("RECTIFICATION_VIEW", Rectification),
    RectificationVerify => ("RECTIFICATION_VERIFY", Rectification),

    PartsView => ("PARTS_VIEW", Parts),
    PartsManage => ("PARTS_MANAGE", Parts),
    PartsUse => ("PARTS_USE", Parts),

    ComplianceReportView => ("COMPLIANCE_REPORT_VIEW", ComplianceReport),
    ComplianceReportGenerate => ("COMPLIANCE_REPORT_GENERATE", ComplianceReport),
}

impl Permission {
    /// Parses a stable permission name. Unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Permission> {
        let raw = raw.trim();
        Permission::ALL
            .iter()
            .copied()
            .find(|permission| permission.as_str() == raw)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::parse(s).ok_or_else(|| CatalogError::UnknownPermission(s.to_string()))
    }
}
