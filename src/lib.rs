//! FleetGuard compliance core
//!
//! Configuration, wiring and the `fleetguard` command-line interface over
//! the authorization and audit-ledger crates.

pub mod app_context;
pub mod cli;
pub mod config;
pub mod errors;
pub mod metrics;

pub use app_context::AppContext;
pub use config::{ConfigError, ConfigSource, FleetGuardConfig, LoadOptions, LoadedConfig};
pub use errors::FleetGuardError;
