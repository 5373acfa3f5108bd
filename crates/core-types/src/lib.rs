//! Shared primitives for the FleetGuard compliance core.
//!
//! Tenant and actor identifiers, the closed [`Role`] set and the
//! [`Principal`] handed over by the session layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while turning raw session data into typed primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unrecognised role: {0}")]
    UnknownRole(String),
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Tenant identifier. Every audit chain is scoped to one company.
    CompanyId
);
numeric_id!(
    /// Identifier of a user account inside a tenant.
    UserId
);
numeric_id!(
    /// Identifier of the domain entity an audit entry documents.
    EntityId
);

/// The five principal categories. The set is closed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    TransportManager,
    Driver,
    Mechanic,
    Auditor,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::TransportManager,
        Role::Driver,
        Role::Mechanic,
        Role::Auditor,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::TransportManager => "TRANSPORT_MANAGER",
            Role::Driver => "DRIVER",
            Role::Mechanic => "MECHANIC",
            Role::Auditor => "AUDITOR",
        }
    }

    /// Parses a stable role name. Unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == raw.trim())
    }

    /// Roles treated as owners of every resource in their tenant.
    pub const fn is_universal_owner(self) -> bool {
        matches!(self, Role::Admin | Role::TransportManager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| CoreError::UnknownRole(s.to_string()))
    }
}

/// The authenticated actor attempting an action.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: UserId,
    pub company_id: CompanyId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<UserId>, company_id: impl Into<CompanyId>, role: Role) -> Self {
        Self {
            id: id.into(),
            company_id: company_id.into(),
            role,
        }
    }
}

/// Raw principal data as delivered by the session collaborator.
///
/// The role is still an untrusted string at this point.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalClaims {
    pub id: i64,
    pub company_id: i64,
    pub role: String,
}

impl TryFrom<PrincipalClaims> for Principal {
    type Error = CoreError;

    fn try_from(claims: PrincipalClaims) -> Result<Self, Self::Error> {
        let role = claims.role.parse::<Role>()?;
        Ok(Principal::new(claims.id, claims.company_id, role))
    }
}
