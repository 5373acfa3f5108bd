//! Closed permission catalog, the static role table and the pure
//! authorization checks built on it.

pub mod catalog;
pub mod engine;
pub mod table;

pub use catalog::{CatalogError, Permission, PermissionDomain};
pub use engine::{
    has_all_permissions, has_any_permission, has_permission, has_permission_for, role_matrix,
    RoleGrants, RoleMatrix,
};
pub use fleetguard_core_types::Role;
pub use table::{permissions_for, sorted_permissions_for, PermissionSet};
