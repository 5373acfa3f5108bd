//! Storage SPI for the ledger plus the in-memory and SQLite backends.

use async_trait::async_trait;
use fleetguard_core_types::CompanyId;
use serde_json::Value;

use crate::errors::StorageError;
use crate::model::{AuditLogEntry, AuditLogFilter, ChainTail, ForkGroup, RecordWrite};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryLedgerStore;
pub use sqlite::SqliteLedgerStore;

/// Writes staged for one tenant, applied all-or-nothing on commit.
#[derive(Clone, Debug)]
pub struct CommitBatch {
    pub company_id: CompanyId,
    pub writes: Vec<RecordWrite>,
    pub entries: Vec<AuditLogEntry>,
}

impl CommitBatch {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            writes: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.entries.is_empty()
    }
}

#[async_trait]
pub trait StoreTransaction: Send {
    fn stage_write(&mut self, write: RecordWrite);
    fn stage_entry(&mut self, entry: AuditLogEntry);
    async fn commit(&mut self) -> Result<(), StorageError>;
    async fn rollback(&mut self) -> Result<(), StorageError>;
    fn is_active(&self) -> bool;
}

/// Transactional persistence for audit chains and co-committed records.
///
/// Commits must reject an entry whose id or previous hash does not extend the
/// tenant's current tail with a `STORAGE.CONFLICT` error.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    async fn begin(&self, company: CompanyId) -> Result<Box<dyn StoreTransaction>, StorageError>;

    async fn latest(&self, company: CompanyId) -> Result<Option<AuditLogEntry>, StorageError>;

    /// Up to `limit` entries with `id > after_id`, ascending.
    async fn page(
        &self,
        company: CompanyId,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>, StorageError>;

    async fn query(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogEntry>, StorageError>;

    /// Groups of two or more entries sharing a previous hash.
    async fn fork_groups(&self, company: CompanyId) -> Result<Vec<ForkGroup>, StorageError>;

    async fn count(&self, company: CompanyId) -> Result<u64, StorageError>;

    async fn record(
        &self,
        company: CompanyId,
        table: &str,
        id: &str,
    ) -> Result<Option<Value>, StorageError>;
}

/// Checks that `entries` extend `tail` one link at a time.
pub(crate) fn check_links(
    tail: Option<ChainTail>,
    entries: &[AuditLogEntry],
) -> Result<(), StorageError> {
    let mut expected_id = tail.as_ref().map_or(1, |t| t.id + 1);
    let mut expected_prev = tail.map(|t| t.hash);
    for entry in entries {
        if entry.id != expected_id || entry.previous_hash != expected_prev {
            return Err(StorageError::conflict(&format!(
                "company {} entry {} does not extend tail (expected id {}, previous {:?})",
                entry.company_id, entry.id, expected_id, expected_prev
            )));
        }
        expected_id += 1;
        expected_prev = Some(entry.current_hash.clone());
    }
    Ok(())
}

pub(crate) fn check_company(batch: &CommitBatch) -> Result<(), StorageError> {
    match batch
        .entries
        .iter()
        .find(|entry| entry.company_id != batch.company_id)
    {
        Some(entry) => Err(StorageError::bad_request(&format!(
            "entry for company {} staged in a transaction for company {}",
            entry.company_id, batch.company_id
        ))),
        None => Ok(()),
    }
}
