//! Per-tenant, hash-chained audit ledger.
//!
//! Each company owns one chain. An entry's hash covers its canonical payload
//! and the hash of its predecessor, so any edit to a persisted entry breaks
//! the chain at that point. Entries are committed in the same unit of work
//! as the business writes they document.

pub mod canonical;
pub mod digest;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod model;
pub mod retry;
pub mod store;

pub use canonical::{canonicalize_to_string, format_timestamp, HashedFields};
pub use digest::chain_hash;
pub use errors::{LedgerError, StorageError};
pub use ledger::{Ledger, LedgerTransaction};
pub use metrics::{register_metrics, LedgerMetricsSnapshot};
pub use model::{
    AuditAction, AuditDraft, AuditLogEntry, AuditLogFilter, ChainTail, ForkGroup, RecordWrite,
};
pub use retry::{BackoffPolicy, RetryPolicy};
pub use store::{CommitBatch, LedgerStore, MemoryLedgerStore, SqliteLedgerStore, StoreTransaction};
