use fleetguard_audit_ledger::{LedgerError, StorageError};
use fleetguard_errors::prelude::*;
use thiserror::Error;

/// Verification could not read or hash the chain. Tampering is reported in
/// the [`IntegrityReport`](crate::IntegrityReport), never through this type.
#[derive(Clone, Debug, Error)]
#[error("{}", .0.summary())]
pub struct VerifyError(pub Box<ErrorObj>);

impl VerifyError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn code(&self) -> ErrorCode {
        self.0.code
    }
}

impl From<StorageError> for VerifyError {
    fn from(err: StorageError) -> Self {
        VerifyError(err.0)
    }
}

impl From<LedgerError> for VerifyError {
    fn from(err: LedgerError) -> Self {
        VerifyError(Box::new(err.to_error_obj()))
    }
}
