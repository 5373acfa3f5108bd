use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use fleetguard_core_types::Role;
use fleetguard_permissions::{role_matrix, sorted_permissions_for, Permission};
use serde::Serialize;

use super::context::CliContext;
use super::output::emit;
use super::values::parse_role;

#[derive(Args, Clone, Debug)]
pub struct RolesArgs {
    /// Only list the permissions granted to this role
    #[arg(long, value_parser = parse_role)]
    pub role: Option<Role>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RolePermissions {
    role: Role,
    permissions: Vec<Permission>,
}

pub fn cmd_roles(args: RolesArgs, ctx: &CliContext) -> Result<ExitCode> {
    match args.role {
        Some(role) => {
            let grants = RolePermissions {
                role,
                permissions: sorted_permissions_for(role),
            };
            emit(ctx.output(), &grants, || {
                let mut lines = vec![format!("{} ({} permissions)", role, grants.permissions.len())];
                lines.extend(grants.permissions.iter().map(|p| format!("  {p}")));
                lines.join("\n")
            })?;
        }
        None => {
            let matrix = role_matrix();
            emit(ctx.output(), &matrix, || matrix.to_string())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
