use clap::Subcommand;

use super::append::AppendArgs;
use super::check::CheckArgs;
use super::logs::LogsArgs;
use super::roles::RolesArgs;
use super::verify::VerifyArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Print the role/permission matrix
    Roles(RolesArgs),

    /// Check whether a role holds a permission
    Check(CheckArgs),

    /// Record an audit entry in the configured ledger
    Append(AppendArgs),

    /// List audit entries of a company
    Logs(LogsArgs),

    /// Verify the hash chain of one or more companies
    Verify(VerifyArgs),

    /// Show build and configuration information
    Info,
}
