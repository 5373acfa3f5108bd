use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use fleetguard_core_types::CompanyId;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument, warn};

use crate::canonical::HashedFields;
use crate::digest::chain_hash;
use crate::errors::LedgerError;
use crate::metrics;
use crate::model::{AuditDraft, AuditLogEntry, AuditLogFilter, ChainTail, ForkGroup, RecordWrite};
use crate::retry::{BackoffPolicy, RetryPolicy};
use crate::store::{LedgerStore, StoreTransaction};

type TenantLocks = DashMap<CompanyId, Arc<Mutex<()>>>;

/// Append and query facade over a [`LedgerStore`].
///
/// Appends for one tenant are serialized by an in-process async lock held
/// from the tail read until commit. Writers outside this process are caught
/// by the store's commit checks and retried under the configured backoff.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    locks: Arc<TenantLocks>,
    retry: Arc<dyn BackoffPolicy>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
            retry: Arc::new(RetryPolicy::default()),
        }
    }

    pub fn with_retry(mut self, policy: impl BackoffPolicy + 'static) -> Self {
        self.retry = Arc::new(policy);
        self
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    fn tenant_lock(&self, company: CompanyId) -> Arc<Mutex<()>> {
        self.locks
            .entry(company)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Opens a unit of work for `company`. The tenant's append lock is held
    /// until the returned transaction finishes or is dropped.
    ///
    /// The lock is not reentrant. Calling [`Ledger::append`], [`Ledger::record`]
    /// or `begin` for the same company while the transaction is alive waits
    /// forever; stage further entries with [`LedgerTransaction::append`].
    pub async fn begin(&self, company: CompanyId) -> Result<LedgerTransaction, LedgerError> {
        let guard = self.tenant_lock(company).lock_owned().await;
        let tail = self
            .store
            .latest(company)
            .await?
            .as_ref()
            .map(ChainTail::from);
        let inner = self.store.begin(company).await?;
        Ok(LedgerTransaction {
            company,
            tail,
            inner,
            appended: Vec::new(),
            _guard: guard,
        })
    }

    /// Records an audit entry with no accompanying business writes.
    pub async fn append(&self, draft: AuditDraft) -> Result<AuditLogEntry, LedgerError> {
        self.record(draft, Vec::new()).await
    }

    /// Commits `writes` and the audit entry for `draft` atomically, retrying
    /// the whole unit of work when a foreign writer moved the chain tail.
    #[instrument(
        name = "ledger.record",
        skip_all,
        fields(company = %draft.company_id, action = %draft.action)
    )]
    pub async fn record(
        &self,
        draft: AuditDraft,
        writes: Vec<RecordWrite>,
    ) -> Result<AuditLogEntry, LedgerError> {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.try_record(&draft, &writes).await {
                Ok(entry) => {
                    metrics::record_append(started.elapsed());
                    debug!(
                        target: "audit-ledger",
                        id = entry.id,
                        attempts,
                        "audit entry committed"
                    );
                    return Ok(entry);
                }
                Err(LedgerError::Storage(err)) if err.is_conflict() => {
                    metrics::record_conflict();
                    if !self.retry.allowed(attempts) {
                        metrics::record_failure();
                        warn!(target: "audit-ledger", attempts, %err, "append retries exhausted");
                        return Err(LedgerError::RetriesExhausted {
                            attempts,
                            last: err,
                        });
                    }
                    let delay = self.retry.delay_after(attempts);
                    debug!(
                        target: "audit-ledger",
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "chain tail moved, retrying append"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    metrics::record_failure();
                    warn!(target: "audit-ledger", %err, "append failed, unit of work discarded");
                    return Err(err);
                }
            }
        }
    }

    async fn try_record(
        &self,
        draft: &AuditDraft,
        writes: &[RecordWrite],
    ) -> Result<AuditLogEntry, LedgerError> {
        let mut tx = self.begin(draft.company_id).await?;
        for write in writes {
            tx.apply(write.clone());
        }
        let entry = tx.append(draft.clone())?;
        tx.commit().await?;
        Ok(entry)
    }

    /// Entries matching `filter`, ascending by id.
    pub async fn get_audit_logs(
        &self,
        filter: &AuditLogFilter,
    ) -> Result<Vec<AuditLogEntry>, LedgerError> {
        Ok(self.store.query(filter).await?)
    }

    pub async fn latest(&self, company: CompanyId) -> Result<Option<AuditLogEntry>, LedgerError> {
        Ok(self.store.latest(company).await?)
    }

    pub async fn count(&self, company: CompanyId) -> Result<u64, LedgerError> {
        Ok(self.store.count(company).await?)
    }

    pub async fn fork_groups(&self, company: CompanyId) -> Result<Vec<ForkGroup>, LedgerError> {
        Ok(self.store.fork_groups(company).await?)
    }

    /// Current committed value of a business record.
    pub async fn record_value(
        &self,
        company: CompanyId,
        table: &str,
        id: &str,
    ) -> Result<Option<Value>, LedgerError> {
        Ok(self.store.record(company, table, id).await?)
    }
}

/// A tenant-scoped unit of work. Nothing staged here is visible until
/// [`LedgerTransaction::commit`] succeeds.
pub struct LedgerTransaction {
    company: CompanyId,
    tail: Option<ChainTail>,
    inner: Box<dyn StoreTransaction>,
    appended: Vec<AuditLogEntry>,
    _guard: OwnedMutexGuard<()>,
}

impl LedgerTransaction {
    pub fn company(&self) -> CompanyId {
        self.company
    }

    pub fn put_record(&mut self, table: impl Into<String>, id: impl Into<String>, value: Value) {
        self.apply(RecordWrite::put(table, id, value));
    }

    pub fn delete_record(&mut self, table: impl Into<String>, id: impl Into<String>) {
        self.apply(RecordWrite::delete(table, id));
    }

    pub fn apply(&mut self, write: RecordWrite) {
        self.inner.stage_write(write);
    }

    /// Stages the next link of the tenant's chain and returns it as it will
    /// be persisted.
    pub fn append(&mut self, draft: AuditDraft) -> Result<AuditLogEntry, LedgerError> {
        if draft.company_id != self.company {
            return Err(LedgerError::Invalid(format!(
                "draft for company {} in a transaction for company {}",
                draft.company_id, self.company
            )));
        }
        let timestamp = draft.resolved_timestamp()?;
        let previous_hash = self.tail.as_ref().map(|tail| tail.hash.clone());
        let mut entry = AuditLogEntry {
            id: self.tail.as_ref().map_or(1, |tail| tail.id + 1),
            company_id: draft.company_id,
            user_id: draft.user_id,
            action: draft.action,
            entity_type: draft.entity_type,
            entity_id: draft.entity_id,
            timestamp,
            changes: draft.changes,
            previous_hash,
            current_hash: String::new(),
        };
        entry.current_hash = chain_hash(
            &HashedFields::from(&entry),
            entry.previous_hash.as_deref(),
        )?;
        self.inner.stage_entry(entry.clone());
        self.tail = Some(ChainTail::from(&entry));
        self.appended.push(entry.clone());
        Ok(entry)
    }

    /// Applies every staged write and entry, or none of them.
    pub async fn commit(mut self) -> Result<Vec<AuditLogEntry>, LedgerError> {
        self.inner.commit().await?;
        Ok(self.appended)
    }

    pub async fn rollback(mut self) -> Result<(), LedgerError> {
        self.inner.rollback().await?;
        Ok(())
    }
}
