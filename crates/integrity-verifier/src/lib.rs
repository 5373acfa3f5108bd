//! Recomputes tenant audit chains and reports tampering.
//!
//! Verification is read-only and takes no ledger locks; it sees committed
//! entries only and can run alongside appends.

pub mod errors;
pub mod report;
pub mod verifier;

pub use errors::VerifyError;
pub use report::{BreakReason, BrokenChain, IntegrityReport};
pub use verifier::{Verifier, DEFAULT_PAGE_SIZE};
