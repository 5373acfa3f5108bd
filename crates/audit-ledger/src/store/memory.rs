use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use fleetguard_core_types::CompanyId;
use parking_lot::RwLock;
use serde_json::Value;

use super::{check_company, check_links, CommitBatch, LedgerStore, StoreTransaction};
use crate::errors::StorageError;
use crate::model::{AuditLogEntry, AuditLogFilter, ChainTail, ForkGroup, RecordWrite};

type RecordKey = (CompanyId, String, String);

#[derive(Default)]
struct Tables {
    chains: HashMap<CompanyId, BTreeMap<i64, AuditLogEntry>>,
    links: HashSet<(CompanyId, Option<String>)>,
    records: HashMap<RecordKey, Value>,
}

#[derive(Default)]
struct Faults {
    unavailable: AtomicU32,
    conflicts: AtomicU32,
}

fn take(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// In-process store used for tests and embedding.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail with `STORAGE.UNAVAILABLE`, applying
    /// nothing.
    pub fn fail_next_commit(&self) {
        self.faults.unavailable.fetch_add(1, Ordering::SeqCst);
    }

    /// Makes the next `n` commits fail with `STORAGE.CONFLICT`.
    pub fn conflict_next_commits(&self, n: u32) {
        self.faults.conflicts.fetch_add(n, Ordering::SeqCst);
    }

    /// Rewrites a stored entry in place, bypassing every ledger rule.
    /// Returns `false` when the entry does not exist.
    #[cfg(feature = "testing")]
    pub fn tamper<F>(&self, company: CompanyId, id: i64, edit: F) -> bool
    where
        F: FnOnce(&mut AuditLogEntry),
    {
        let mut tables = self.tables.write();
        match tables
            .chains
            .get_mut(&company)
            .and_then(|chain| chain.get_mut(&id))
        {
            Some(entry) => {
                edit(entry);
                true
            }
            None => false,
        }
    }

    /// Stores `entry` without link or uniqueness checks, replacing any entry
    /// with the same id.
    #[cfg(feature = "testing")]
    pub fn insert_unchecked(&self, entry: AuditLogEntry) {
        let mut tables = self.tables.write();
        tables
            .chains
            .entry(entry.company_id)
            .or_default()
            .insert(entry.id, entry);
    }

    fn apply(&self, batch: CommitBatch) -> Result<(), StorageError> {
        check_company(&batch)?;
        if take(&self.faults.unavailable) {
            return Err(StorageError::unavailable("injected commit failure"));
        }
        if take(&self.faults.conflicts) {
            return Err(StorageError::conflict("injected chain-tail conflict"));
        }

        let mut tables = self.tables.write();
        let company = batch.company_id;

        if !batch.entries.is_empty() {
            let tail = tables
                .chains
                .get(&company)
                .and_then(|chain| chain.values().next_back())
                .map(ChainTail::from);
            check_links(tail, &batch.entries)?;
            for entry in &batch.entries {
                if tables
                    .links
                    .contains(&(company, entry.previous_hash.clone()))
                {
                    return Err(StorageError::conflict(&format!(
                        "company {company} already has an entry after {:?}",
                        entry.previous_hash
                    )));
                }
            }
        }

        for write in batch.writes {
            match write {
                RecordWrite::Put { table, id, value } => {
                    tables.records.insert((company, table, id), value);
                }
                RecordWrite::Delete { table, id } => {
                    tables.records.remove(&(company, table, id));
                }
            }
        }
        for entry in batch.entries {
            tables.links.insert((company, entry.previous_hash.clone()));
            tables
                .chains
                .entry(company)
                .or_default()
                .insert(entry.id, entry);
        }
        Ok(())
    }

    fn chain_snapshot<T>(
        &self,
        company: CompanyId,
        read: impl FnOnce(&BTreeMap<i64, AuditLogEntry>) -> T,
    ) -> Option<T> {
        let tables = self.tables.read();
        tables.chains.get(&company).map(read)
    }
}

pub struct MemoryTransaction {
    store: MemoryLedgerStore,
    batch: CommitBatch,
    active: bool,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.active {
            Ok(())
        } else {
            Err(StorageError::bad_request("transaction already closed"))
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    fn stage_write(&mut self, write: RecordWrite) {
        self.batch.writes.push(write);
    }

    fn stage_entry(&mut self, entry: AuditLogEntry) {
        self.batch.entries.push(entry);
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.active = false;
        let company = self.batch.company_id;
        let batch = std::mem::replace(&mut self.batch, CommitBatch::new(company));
        self.store.apply(batch)
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.active = false;
        self.batch = CommitBatch::new(self.batch.company_id);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self, company: CompanyId) -> Result<Box<dyn StoreTransaction>, StorageError> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            batch: CommitBatch::new(company),
            active: true,
        }))
    }

    async fn latest(&self, company: CompanyId) -> Result<Option<AuditLogEntry>, StorageError> {
        Ok(self
            .chain_snapshot(company, |chain| chain.values().next_back().cloned())
            .flatten())
    }

    async fn page(
        &self,
        company: CompanyId,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>, StorageError> {
        Ok(self
            .chain_snapshot(company, |chain| {
                chain
                    .range(after_id.saturating_add(1)..)
                    .take(limit)
                    .map(|(_, entry)| entry.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogEntry>, StorageError> {
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(self
            .chain_snapshot(filter.company_id, |chain| {
                chain
                    .values()
                    .filter(|entry| filter.matches(entry))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fork_groups(&self, company: CompanyId) -> Result<Vec<ForkGroup>, StorageError> {
        let mut groups = self
            .chain_snapshot(company, |chain| {
                let mut by_link: BTreeMap<Option<String>, Vec<i64>> = BTreeMap::new();
                for entry in chain.values() {
                    by_link
                        .entry(entry.previous_hash.clone())
                        .or_default()
                        .push(entry.id);
                }
                by_link
                    .into_iter()
                    .filter(|(_, ids)| ids.len() > 1)
                    .map(|(previous_hash, log_ids)| ForkGroup {
                        previous_hash,
                        log_ids,
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        groups.sort_by_key(|group| group.log_ids.first().copied());
        Ok(groups)
    }

    async fn count(&self, company: CompanyId) -> Result<u64, StorageError> {
        Ok(self
            .chain_snapshot(company, |chain| chain.len() as u64)
            .unwrap_or(0))
    }

    async fn record(
        &self,
        company: CompanyId,
        table: &str,
        id: &str,
    ) -> Result<Option<Value>, StorageError> {
        let tables = self.tables.read();
        Ok(tables
            .records
            .get(&(company, table.to_string(), id.to_string()))
            .cloned())
    }
}
