use std::fmt;

use fleetguard_core_types::Role;
use serde::Serialize;
use tracing::debug;

use crate::catalog::Permission;
use crate::table::{permissions_for, sorted_permissions_for};

/// Whether `role` is granted `permission`.
pub fn has_permission(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

/// At least one of `permissions` is granted. An empty list grants nothing.
pub fn has_any_permission(role: Role, permissions: &[Permission]) -> bool {
    let granted = permissions_for(role);
    permissions.iter().any(|p| granted.contains(p))
}

/// Every one of `permissions` is granted. An empty list is vacuously held.
pub fn has_all_permissions(role: Role, permissions: &[Permission]) -> bool {
    let granted = permissions_for(role);
    permissions.iter().all(|p| granted.contains(p))
}

/// Checks a raw role name as it arrives from the session layer.
///
/// Names outside the closed role set hold no permission.
pub fn has_permission_for(raw_role: &str, permission: Permission) -> bool {
    match Role::parse(raw_role) {
        Some(role) => has_permission(role, permission),
        None => {
            debug!(target: "permissions", role = raw_role, "unknown role holds no permissions");
            false
        }
    }
}

/// One row of the role/permission matrix.
#[derive(Clone, Debug, Serialize)]
pub struct RoleGrants {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// The complete grant table, roles in their canonical order.
#[derive(Clone, Debug, Serialize)]
pub struct RoleMatrix {
    pub roles: Vec<RoleGrants>,
}

impl RoleMatrix {
    pub fn grants(&self, role: Role) -> Option<&RoleGrants> {
        self.roles.iter().find(|row| row.role == role)
    }
}

pub fn role_matrix() -> RoleMatrix {
    RoleMatrix {
        roles: Role::ALL
            .into_iter()
            .map(|role| RoleGrants {
                role,
                permissions: sorted_permissions_for(role),
            })
            .collect(),
    }
}

impl fmt::Display for RoleMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = Permission::ALL
            .iter()
            .map(|p| p.as_str().len())
            .max()
            .unwrap_or(0);

        write!(f, "{:width$}", "PERMISSION", width = width)?;
        for row in &self.roles {
            write!(f, "  {}", row.role)?;
        }
        writeln!(f)?;

        for permission in Permission::ALL {
            write!(f, "{:width$}", permission.as_str(), width = width)?;
            for row in &self.roles {
                let mark = if row.permissions.contains(permission) {
                    "x"
                } else {
                    "-"
                };
                write!(f, "  {:^w$}", mark, w = row.role.as_str().len())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_cannot_assign_defects_but_admin_can() {
        assert!(!has_permission(Role::Driver, Permission::DefectAssign));
        assert!(has_permission(Role::Admin, Permission::DefectAssign));
        assert!(has_permission(Role::TransportManager, Permission::DefectAssign));
    }

    #[test]
    fn empty_lists_follow_any_and_all_conventions() {
        for role in Role::ALL {
            assert!(!has_any_permission(role, &[]));
            assert!(has_all_permissions(role, &[]));
        }
    }

    #[test]
    fn any_and_all_combine_grants() {
        let mixed = [Permission::DefectCreate, Permission::UserDelete];
        assert!(has_any_permission(Role::Driver, &mixed));
        assert!(!has_all_permissions(Role::Driver, &mixed));
        assert!(has_all_permissions(Role::TransportManager, &mixed));
    }

    #[test]
    fn raw_role_names_fail_closed() {
        assert!(has_permission_for("ADMIN", Permission::UserDelete));
        assert!(!has_permission_for("SUPER_ADMIN", Permission::UserView));
        assert!(!has_permission_for("", Permission::InspectionView));
    }

    #[test]
    fn matrix_lists_every_role_in_catalog_order() {
        let matrix = role_matrix();
        assert_eq!(matrix.roles.len(), Role::ALL.len());
        let admin = matrix.grants(Role::Admin).unwrap();
        assert_eq!(admin.permissions, Permission::ALL.to_vec());

        let rendered = matrix.to_string();
        assert!(rendered.starts_with("PERMISSION"));
        assert_eq!(rendered.lines().count(), Permission::ALL.len() + 1);
    }
}
