//! Error surfaced by CLI commands, unified over the shared `ErrorObj`.

use fleetguard_audit_ledger::{LedgerError, StorageError};
use fleetguard_authz_gate::GateRejection;
use fleetguard_errors::prelude::*;
use fleetguard_integrity::VerifyError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error)]
#[error("{}", .inner.summary())]
pub struct FleetGuardError {
    inner: Box<ErrorObj>,
}

impl FleetGuardError {
    pub fn new(obj: ErrorObj) -> Self {
        Self {
            inner: Box::new(obj),
        }
    }

    pub fn validation(message: &str, details: impl Into<String>) -> Self {
        Self::new(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg(message)
                .dev_msg(details)
                .build(),
        )
    }

    pub fn code(&self) -> ErrorCode {
        self.inner.code
    }

    pub fn error_obj(&self) -> &ErrorObj {
        &self.inner
    }

    pub fn public_view(&self) -> PublicErrorView {
        self.inner.to_public()
    }

    pub fn audit_view(&self) -> AuditErrorView {
        self.inner.to_audit()
    }
}

impl From<ErrorObj> for FleetGuardError {
    fn from(obj: ErrorObj) -> Self {
        Self::new(obj)
    }
}

impl From<StorageError> for FleetGuardError {
    fn from(err: StorageError) -> Self {
        Self::new(err.into_inner())
    }
}

impl From<LedgerError> for FleetGuardError {
    fn from(err: LedgerError) -> Self {
        Self::new(err.to_error_obj())
    }
}

impl From<VerifyError> for FleetGuardError {
    fn from(err: VerifyError) -> Self {
        Self::new(err.into_inner())
    }
}

impl From<GateRejection> for FleetGuardError {
    fn from(err: GateRejection) -> Self {
        Self::new(err.into_inner())
    }
}

impl From<ConfigError> for FleetGuardError {
    fn from(err: ConfigError) -> Self {
        Self::validation("Invalid configuration", err.to_string())
    }
}
