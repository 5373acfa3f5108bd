//! The static role → permission table.
//!
//! Built once on first use and never mutated. Grants change only with a
//! code change.

use std::collections::{HashMap, HashSet};

use fleetguard_core_types::Role;
use once_cell::sync::Lazy;

use crate::catalog::Permission::{self, *};

pub type PermissionSet = HashSet<Permission>;

const DRIVER: &[Permission] = &[
    InspectionCreate,
    InspectionView,
    DefectCreate,
    DefectView,
    VehicleView,
    ReminderView,
    TimesheetCreate,
    TimesheetView,
];

const MECHANIC: &[Permission] = &[
    InspectionView,
    InspectionViewAll,
    DefectView,
    DefectViewAll,
    DefectUpdate,
    DefectRectify,
    VehicleView,
    ReminderView,
    ReminderComplete,
    TimesheetCreate,
    TimesheetView,
    RectificationCreate,
    RectificationView,
    PartsView,
    PartsManage,
    PartsUse,
];

const AUDITOR: &[Permission] = &[
    InspectionView,
    InspectionViewAll,
    DefectView,
    DefectViewAll,
    UserView,
    VehicleView,
    ReminderView,
    ReportView,
    ReportExport,
    AuditLogView,
    AuditLogExport,
    AuditLogVerify,
    TimesheetView,
    TimesheetViewAll,
    RectificationView,
    PartsView,
    ComplianceReportView,
    ComplianceReportGenerate,
];

const TRANSPORT_MANAGER: &[Permission] = &[
    InspectionCreate,
    InspectionView,
    InspectionViewAll,
    InspectionUpdate,
    InspectionDelete,
    DefectCreate,
    DefectView,
    DefectViewAll,
    DefectUpdate,
    DefectAssign,
    DefectVerify,
    DefectClose,
    UserCreate,
    UserView,
    UserUpdate,
    UserDelete,
    VehicleCreate,
    VehicleView,
    VehicleUpdate,
    VehicleDelete,
    ReminderCreate,
    ReminderView,
    ReminderUpdate,
    ReminderDelete,
    ReminderComplete,
    ReportView,
    ReportGenerate,
    ReportExport,
    AuditLogView,
    AuditLogExport,
    TimesheetCreate,
    TimesheetView,
    TimesheetViewAll,
    TimesheetApprove,
    RectificationView,
    RectificationVerify,
    PartsView,
    PartsUse,
    ComplianceReportView,
    ComplianceReportGenerate,
];

// Must stay equal to the union of the four roles above.
const ADMIN: &[Permission] = &[
    InspectionCreate,
    InspectionView,
    InspectionViewAll,
    InspectionUpdate,
    InspectionDelete,
    DefectCreate,
    DefectView,
    DefectViewAll,
    DefectUpdate,
    DefectAssign,
    DefectRectify,
    DefectVerify,
    DefectClose,
    UserCreate,
    UserView,
    UserUpdate,
    UserDelete,
    VehicleCreate,
    VehicleView,
    VehicleUpdate,
    VehicleDelete,
    ReminderCreate,
    ReminderView,
    ReminderUpdate,
    ReminderDelete,
    ReminderComplete,
    ReportView,
    ReportGenerate,
    ReportExport,
    AuditLogView,
    AuditLogExport,
    AuditLogVerify,
    TimesheetCreate,
    TimesheetView,
    TimesheetViewAll,
    TimesheetApprove,
    RectificationCreate,
    RectificationView,
    RectificationVerify,
    PartsView,
    PartsManage,
    PartsUse,
    ComplianceReportView,
    ComplianceReportGenerate,
];

const fn grants(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => ADMIN,
        Role::TransportManager => TRANSPORT_MANAGER,
        Role::Driver => DRIVER,
        Role::Mechanic => MECHANIC,
        Role::Auditor => AUDITOR,
    }
}

pub(crate) static ROLE_PERMISSIONS: Lazy<HashMap<Role, PermissionSet>> = Lazy::new(|| {
    Role::ALL
        .into_iter()
        .map(|role| (role, grants(role).iter().copied().collect()))
        .collect()
});

static EMPTY: Lazy<PermissionSet> = Lazy::new(PermissionSet::new);

/// The full grant set of a role.
pub fn permissions_for(role: Role) -> &'static PermissionSet {
    ROLE_PERMISSIONS.get(&role).unwrap_or(&EMPTY)
}

/// A role's grants in catalog order, for listings.
pub fn sorted_permissions_for(role: Role) -> Vec<Permission> {
    let set = permissions_for(role);
    Permission::ALL
        .iter()
        .copied()
        .filter(|permission| set.contains(permission))
        .collect()
}
