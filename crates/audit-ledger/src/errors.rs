use fleetguard_errors::prelude::*;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
#[error("{}", .0.summary())]
pub struct StorageError(pub Box<ErrorObj>);

impl StorageError {
    fn build(code: ErrorCode, msg: &str) -> Self {
        StorageError(Box::new(ErrorBuilder::new(code).dev_msg(msg).build()))
    }

    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn code(&self) -> ErrorCode {
        self.0.code
    }

    pub fn is_conflict(&self) -> bool {
        self.0.code == codes::STORAGE_CONFLICT
    }

    pub fn not_found(msg: &str) -> Self {
        Self::build(codes::STORAGE_NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::build(codes::STORAGE_CONFLICT, msg)
    }

    pub fn unavailable(msg: &str) -> Self {
        Self::build(codes::STORAGE_UNAVAILABLE, msg)
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::build(codes::SCHEMA_VALIDATION, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::build(codes::UNKNOWN_INTERNAL, msg)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode as Sqlite;
        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                Sqlite::ConstraintViolation => StorageError::conflict(&err.to_string()),
                Sqlite::DatabaseBusy | Sqlite::DatabaseLocked => {
                    StorageError::unavailable(&err.to_string())
                }
                Sqlite::CannotOpen | Sqlite::NotADatabase | Sqlite::ReadOnly => {
                    StorageError::unavailable(&err.to_string())
                }
                _ => StorageError::internal(&err.to_string()),
            },
            _ => StorageError::internal(&err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("append conflict persisted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: StorageError },

    #[error("canonical encoding failed: {0}")]
    Encoding(String),

    #[error("invalid ledger request: {0}")]
    Invalid(String),
}

impl LedgerError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Storage(err) if err.is_conflict())
    }

    pub fn to_error_obj(&self) -> ErrorObj {
        match self {
            LedgerError::Storage(err) => (*err.0).clone(),
            LedgerError::RetriesExhausted { attempts, last } => {
                ErrorBuilder::new(codes::STORAGE_CONFLICT)
                    .dev_msg(format!("gave up after {attempts} attempts: {last}"))
                    .meta_kv("attempts", serde_json::json!(attempts))
                    .build()
            }
            LedgerError::Encoding(msg) => ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .dev_msg(msg.clone())
                .build(),
            LedgerError::Invalid(msg) => ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .dev_msg(msg.clone())
                .build(),
        }
    }
}
