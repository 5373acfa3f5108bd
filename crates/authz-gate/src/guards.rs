use fleetguard_core_types::{Principal, Role};
use fleetguard_permissions::{has_all_permissions, has_any_permission, has_permission, Permission};
use serde_json::Value;
use tracing::warn;

use crate::context::GateContext;
use crate::errors::GateRejection;

/// One request-boundary check. Guards are pure and never touch the ledger.
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, cx: &GateContext) -> Result<(), GateRejection>;
}

fn deny(cx: &GateContext, guard: &dyn Guard, rejection: GateRejection) -> GateRejection {
    let rejection = rejection.with_correlation(&cx.request_id);
    warn!(
        target: "authz-gate",
        request_id = %cx.request_id,
        guard = guard.name(),
        role = rejection.body().user_role.as_deref().unwrap_or("-"),
        status = rejection.status(),
        reason = %rejection,
        "request denied"
    );
    rejection
}

/// The caller's classified principal. Unclassified callers are refused with
/// the guard's own 403, carrying their raw role.
fn classified<'a>(
    cx: &'a GateContext,
    guard: &dyn Guard,
    refuse: impl FnOnce(&str) -> GateRejection,
) -> Result<&'a Principal, GateRejection> {
    match (&cx.principal, &cx.unclassified) {
        (Some(principal), _) => Ok(principal),
        (None, Some(claims)) => Err(deny(cx, guard, refuse(&claims.role))),
        (None, None) => Err(deny(cx, guard, GateRejection::unauthenticated())),
    }
}

pub struct RequireAuth;

impl Guard for RequireAuth {
    fn name(&self) -> &'static str {
        "require_auth"
    }

    fn check(&self, cx: &GateContext) -> Result<(), GateRejection> {
        if cx.is_authenticated() {
            Ok(())
        } else {
            Err(deny(cx, self, GateRejection::unauthenticated()))
        }
    }
}

pub struct RequirePermission(pub Permission);

impl Guard for RequirePermission {
    fn name(&self) -> &'static str {
        "require_permission"
    }

    fn check(&self, cx: &GateContext) -> Result<(), GateRejection> {
        let principal = classified(cx, self, |raw| {
            GateRejection::missing_permission(raw, self.0)
        })?;
        if has_permission(principal.role, self.0) {
            Ok(())
        } else {
            Err(deny(
                cx,
                self,
                GateRejection::missing_permission(principal.role, self.0),
            ))
        }
    }
}

pub struct RequireAnyPermission(pub Vec<Permission>);

impl Guard for RequireAnyPermission {
    fn name(&self) -> &'static str {
        "require_any_permission"
    }

    fn check(&self, cx: &GateContext) -> Result<(), GateRejection> {
        let principal = classified(cx, self, |raw| {
            GateRejection::missing_permissions(raw, &self.0, false)
        })?;
        if has_any_permission(principal.role, &self.0) {
            Ok(())
        } else {
            Err(deny(
                cx,
                self,
                GateRejection::missing_permissions(principal.role, &self.0, false),
            ))
        }
    }
}

pub struct RequireAllPermissions(pub Vec<Permission>);

impl Guard for RequireAllPermissions {
    fn name(&self) -> &'static str {
        "require_all_permissions"
    }

    fn check(&self, cx: &GateContext) -> Result<(), GateRejection> {
        let principal = classified(cx, self, |raw| {
            GateRejection::missing_permissions(raw, &self.0, true)
        })?;
        if has_all_permissions(principal.role, &self.0) {
            Ok(())
        } else {
            Err(deny(
                cx,
                self,
                GateRejection::missing_permissions(principal.role, &self.0, true),
            ))
        }
    }
}

pub struct RequireRole(pub Role);

impl Guard for RequireRole {
    fn name(&self) -> &'static str {
        "require_role"
    }

    fn check(&self, cx: &GateContext) -> Result<(), GateRejection> {
        let principal = classified(cx, self, |raw| GateRejection::wrong_role(raw, self.0))?;
        if principal.role == self.0 {
            Ok(())
        } else {
            Err(deny(cx, self, GateRejection::wrong_role(principal.role, self.0)))
        }
    }
}

pub struct RequireAnyRole(pub Vec<Role>);

impl Guard for RequireAnyRole {
    fn name(&self) -> &'static str {
        "require_any_role"
    }

    fn check(&self, cx: &GateContext) -> Result<(), GateRejection> {
        let principal = classified(cx, self, |raw| GateRejection::wrong_roles(raw, &self.0))?;
        if self.0.contains(&principal.role) {
            Ok(())
        } else {
            Err(deny(cx, self, GateRejection::wrong_roles(principal.role, &self.0)))
        }
    }
}

/// Ownership check against a request parameter holding a user id.
///
/// ADMIN and TRANSPORT_MANAGER own every resource in their tenant. A missing
/// or non-numeric field never matches.
pub struct RequireResourceOwnership {
    pub owner_field: String,
}

impl Guard for RequireResourceOwnership {
    fn name(&self) -> &'static str {
        "require_resource_ownership"
    }

    fn check(&self, cx: &GateContext) -> Result<(), GateRejection> {
        let principal = classified(cx, self, |raw| {
            GateRejection::not_owner(raw, &self.owner_field)
        })?;
        if principal.role.is_universal_owner() {
            return Ok(());
        }
        let owner = cx.param(&self.owner_field).and_then(owner_id);
        if owner == Some(principal.id.get()) {
            Ok(())
        } else {
            Err(deny(
                cx,
                self,
                GateRejection::not_owner(principal.role, &self.owner_field),
            ))
        }
    }
}

fn owner_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn require_auth() -> RequireAuth {
    RequireAuth
}

pub fn require_permission(permission: Permission) -> RequirePermission {
    RequirePermission(permission)
}

pub fn require_any_permission(permissions: impl Into<Vec<Permission>>) -> RequireAnyPermission {
    RequireAnyPermission(permissions.into())
}

pub fn require_all_permissions(permissions: impl Into<Vec<Permission>>) -> RequireAllPermissions {
    RequireAllPermissions(permissions.into())
}

pub fn require_role(role: Role) -> RequireRole {
    RequireRole(role)
}

pub fn require_any_role(roles: impl Into<Vec<Role>>) -> RequireAnyRole {
    RequireAnyRole(roles.into())
}

pub fn require_resource_ownership(owner_field: impl Into<String>) -> RequireResourceOwnership {
    RequireResourceOwnership {
        owner_field: owner_field.into(),
    }
}
