//! Stable error codes and the structured error object shared across the
//! FleetGuard crates.
//!
//! Each code is registered once with its kind, HTTP status, retry class and
//! severity. Crate-level error types wrap [`ErrorObj`] rather than inventing
//! their own status mapping.

pub mod code;
pub mod kind;
pub mod model;
pub mod prelude;
pub mod render;

pub use prelude::*;
