use std::fmt::Display;

use fleetguard_core_types::Role;
use fleetguard_errors::prelude::*;
use fleetguard_permissions::Permission;
use serde::Serialize;
use thiserror::Error;

/// JSON body returned with a 401/403.
///
/// Only the caller's own role is echoed back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<Permission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<Permission>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
}

impl DenialBody {
    fn new(obj: &ErrorObj) -> Self {
        Self {
            error: obj.kind.taxonomy(),
            message: obj.message_user.clone(),
            required_permission: None,
            required_permissions: None,
            required_role: None,
            required_roles: None,
            user_role: None,
        }
    }
}

/// Terminal denial produced by a guard.
#[derive(Clone, Debug, Error)]
#[error("{}: {}", .body.error, .body.message)]
pub struct GateRejection {
    obj: ErrorObj,
    body: DenialBody,
}

impl GateRejection {
    fn build(obj: ErrorObj, edit: impl FnOnce(&mut DenialBody)) -> Self {
        let mut body = DenialBody::new(&obj);
        edit(&mut body);
        Self { obj, body }
    }

    pub fn unauthenticated() -> Self {
        let obj = ErrorBuilder::new(codes::AUTH_UNAUTHENTICATED)
            .user_msg("Authentication required")
            .build();
        Self::build(obj, |_| {})
    }

    pub fn missing_permission(role: impl Display, permission: Permission) -> Self {
        let obj = ErrorBuilder::new(codes::AUTH_FORBIDDEN)
            .user_msg("Insufficient permissions")
            .dev_msg(format!("{role} lacks {permission}"))
            .build();
        Self::build(obj, |body| {
            body.required_permission = Some(permission);
            body.user_role = Some(role.to_string());
        })
    }

    pub fn missing_permissions(role: impl Display, permissions: &[Permission], all: bool) -> Self {
        let mode = if all { "all of" } else { "any of" };
        let names: Vec<&str> = permissions.iter().map(|p| p.as_str()).collect();
        let obj = ErrorBuilder::new(codes::AUTH_FORBIDDEN)
            .user_msg("Insufficient permissions")
            .dev_msg(format!("{role} lacks {mode} [{}]", names.join(", ")))
            .build();
        Self::build(obj, |body| {
            body.required_permissions = Some(permissions.to_vec());
            body.user_role = Some(role.to_string());
        })
    }

    pub fn wrong_role(role: impl Display, required: Role) -> Self {
        let obj = ErrorBuilder::new(codes::AUTH_FORBIDDEN)
            .user_msg("Insufficient role")
            .build();
        Self::build(obj, |body| {
            body.required_role = Some(required);
            body.user_role = Some(role.to_string());
        })
    }

    pub fn wrong_roles(role: impl Display, required: &[Role]) -> Self {
        let obj = ErrorBuilder::new(codes::AUTH_FORBIDDEN)
            .user_msg("Insufficient role")
            .build();
        Self::build(obj, |body| {
            body.required_roles = Some(required.to_vec());
            body.user_role = Some(role.to_string());
        })
    }

    pub fn not_owner(role: impl Display, owner_field: &str) -> Self {
        let obj = ErrorBuilder::new(codes::AUTH_FORBIDDEN)
            .user_msg("You can only access your own resources")
            .dev_msg(format!("ownership check failed on {owner_field}"))
            .build();
        Self::build(obj, |body| {
            body.user_role = Some(role.to_string());
        })
    }

    /// Tags the underlying error with the request id.
    pub fn with_correlation(mut self, request_id: &str) -> Self {
        self.obj = self.obj.with_correlation(request_id);
        self
    }

    pub fn status(&self) -> u16 {
        self.obj.http_status
    }

    pub fn body(&self) -> &DenialBody {
        &self.body
    }

    pub fn error_obj(&self) -> &ErrorObj {
        &self.obj
    }

    pub fn into_inner(self) -> ErrorObj {
        self.obj
    }
}

pub fn to_http_response(rejection: &GateRejection) -> (u16, serde_json::Value) {
    let body = serde_json::to_value(&rejection.body).unwrap_or_else(|_| {
        serde_json::json!({
            "error": rejection.body.error,
            "message": rejection.body.message,
        })
    });
    (rejection.status(), body)
}
