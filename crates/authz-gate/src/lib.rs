//! Authorization gate: composable guards evaluated at the request boundary.
//!
//! Guards answer 401 when no principal is attached and 403 when the principal
//! lacks the required permission, role or ownership. Denials are terminal.

#[cfg(feature = "with-axum")]
pub mod adapter;
pub mod chain;
pub mod context;
pub mod errors;
pub mod guards;

pub use chain::GuardChain;
pub use context::GateContext;
pub use errors::{to_http_response, DenialBody, GateRejection};
pub use guards::{
    require_all_permissions, require_any_permission, require_any_role, require_auth,
    require_permission, require_resource_ownership, require_role, Guard, RequireAllPermissions,
    RequireAnyPermission, RequireAnyRole, RequireAuth, RequirePermission, RequireResourceOwnership,
    RequireRole,
};

pub mod prelude {
    pub use crate::{
        require_all_permissions, require_any_permission, require_any_role, require_auth,
        require_permission, require_resource_ownership, require_role, GateContext, GateRejection,
        Guard, GuardChain,
    };
    pub use fleetguard_core_types::{Principal, Role};
    pub use fleetguard_permissions::Permission;
}
