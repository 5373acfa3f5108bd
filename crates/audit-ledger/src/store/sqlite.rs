//! SQLite-backed ledger store.
//!
//! WAL mode lets readers (verification, reporting) proceed while a commit is
//! in flight. Commits take `BEGIN IMMEDIATE`, re-read the tail and rely on
//! the schema's uniqueness constraints, so writers in other processes cannot
//! fork a chain either. Rows in `audit_logs` are protected by triggers
//! against UPDATE and DELETE.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use fleetguard_core_types::{CompanyId, EntityId, UserId};
use parking_lot::Mutex;
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{
    params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior,
};
use serde_json::Value;
use tracing::debug;

use super::{check_company, check_links, CommitBatch, LedgerStore, StoreTransaction};
use crate::canonical::format_timestamp;
use crate::errors::StorageError;
use crate::model::{AuditAction, AuditLogEntry, AuditLogFilter, ChainTail, ForkGroup, RecordWrite};

const SCHEMA_SQL: &str = include_str!("schema.sql");

const ENTRY_COLUMNS: &str = "company_id, id, user_id, action, entity_type, entity_id, \
                             timestamp, changes, previous_hash, current_hash";

#[derive(Clone)]
pub struct SqliteLedgerStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteLedgerStore {
    /// Opens or creates a ledger database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| StorageError::unavailable(&format!("open {}: {err}", path.display())))?;
        Self::initialize(&conn)?;
        debug!(target: "audit-ledger", path = %path.display(), "sqlite ledger opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn initialize(conn: &Connection) -> Result<(), StorageError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            work(&mut guard)
        })
        .await
        .map_err(|err| StorageError::internal(&format!("sqlite task failed: {err}")))?
    }
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<AuditLogEntry> {
    let action: String = row.get(3)?;
    let action = AuditAction::parse(&action)
        .ok_or_else(|| conversion_error(3, format!("unknown action {action}")))?;
    let timestamp: String = row.get(6)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|err| conversion_error(6, err))?
        .with_timezone(&Utc);
    let changes: String = row.get(7)?;
    let changes: Value = serde_json::from_str(&changes).map_err(|err| conversion_error(7, err))?;

    Ok(AuditLogEntry {
        company_id: CompanyId(row.get(0)?),
        id: row.get(1)?,
        user_id: UserId(row.get(2)?),
        action,
        entity_type: row.get(4)?,
        entity_id: EntityId(row.get(5)?),
        timestamp,
        changes,
        previous_hash: row.get(8)?,
        current_hash: row.get(9)?,
    })
}

fn commit_batch(conn: &mut Connection, batch: &CommitBatch) -> Result<(), StorageError> {
    check_company(batch)?;
    let company = batch.company_id.get();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if !batch.entries.is_empty() {
        let tail = tx
            .query_row(
                "SELECT id, current_hash FROM audit_logs
                 WHERE company_id = ?1 ORDER BY id DESC LIMIT 1",
                params![company],
                |row| {
                    Ok(ChainTail {
                        id: row.get(0)?,
                        hash: row.get(1)?,
                    })
                },
            )
            .optional()?;
        check_links(tail, &batch.entries)?;
    }

    for write in &batch.writes {
        match write {
            RecordWrite::Put { table, id, value } => {
                let encoded = serde_json::to_string(value)
                    .map_err(|err| StorageError::bad_request(&format!("record value: {err}")))?;
                tx.execute(
                    "INSERT INTO records (company_id, tbl, id, value) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (company_id, tbl, id) DO UPDATE SET value = excluded.value",
                    params![company, table, id, encoded],
                )?;
            }
            RecordWrite::Delete { table, id } => {
                tx.execute(
                    "DELETE FROM records WHERE company_id = ?1 AND tbl = ?2 AND id = ?3",
                    params![company, table, id],
                )?;
            }
        }
    }

    for entry in &batch.entries {
        let changes = serde_json::to_string(&entry.changes)
            .map_err(|err| StorageError::bad_request(&format!("changes: {err}")))?;
        tx.execute(
            &format!(
                "INSERT INTO audit_logs ({ENTRY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                company,
                entry.id,
                entry.user_id.get(),
                entry.action.as_str(),
                entry.entity_type,
                entry.entity_id.get(),
                format_timestamp(&entry.timestamp),
                changes,
                entry.previous_hash,
                entry.current_hash,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

pub struct SqliteTransaction {
    store: SqliteLedgerStore,
    batch: Option<CommitBatch>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    fn stage_write(&mut self, write: RecordWrite) {
        if let Some(batch) = self.batch.as_mut() {
            batch.writes.push(write);
        }
    }

    fn stage_entry(&mut self, entry: AuditLogEntry) {
        if let Some(batch) = self.batch.as_mut() {
            batch.entries.push(entry);
        }
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        let batch = self
            .batch
            .take()
            .ok_or_else(|| StorageError::bad_request("transaction already closed"))?;
        if batch.is_empty() {
            return Ok(());
        }
        self.store
            .blocking(move |conn| commit_batch(conn, &batch))
            .await
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        self.batch
            .take()
            .map(|_| ())
            .ok_or_else(|| StorageError::bad_request("transaction already closed"))
    }

    fn is_active(&self) -> bool {
        self.batch.is_some()
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn begin(&self, company: CompanyId) -> Result<Box<dyn StoreTransaction>, StorageError> {
        Ok(Box::new(SqliteTransaction {
            store: self.clone(),
            batch: Some(CommitBatch::new(company)),
        }))
    }

    async fn latest(&self, company: CompanyId) -> Result<Option<AuditLogEntry>, StorageError> {
        self.blocking(move |conn| {
            let entry = conn
                .query_row(
                    &format!(
                        "SELECT {ENTRY_COLUMNS} FROM audit_logs
                         WHERE company_id = ?1 ORDER BY id DESC LIMIT 1"
                    ),
                    params![company.get()],
                    row_to_entry,
                )
                .optional()?;
            Ok(entry)
        })
        .await
    }

    async fn page(
        &self,
        company: CompanyId,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.blocking(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {ENTRY_COLUMNS} FROM audit_logs
                 WHERE company_id = ?1 AND id > ?2
                 ORDER BY id ASC LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![company.get(), after_id, limit], row_to_entry)?;
            let entries = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
    }

    async fn query(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogEntry>, StorageError> {
        let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM audit_logs WHERE company_id = ?");
        let mut args = vec![SqlValue::Integer(filter.company_id.get())];
        if let Some(entity_type) = &filter.entity_type {
            sql.push_str(" AND entity_type = ?");
            args.push(SqlValue::Text(entity_type.clone()));
        }
        if let Some(entity_id) = filter.entity_id {
            sql.push_str(" AND entity_id = ?");
            args.push(SqlValue::Integer(entity_id.get()));
        }
        if let Some(user_id) = filter.user_id {
            sql.push_str(" AND user_id = ?");
            args.push(SqlValue::Integer(user_id.get()));
        }
        if let Some(action) = filter.action {
            sql.push_str(" AND action = ?");
            args.push(SqlValue::Text(action.as_str().to_string()));
        }
        // Stored timestamps are fixed-width text, so bounds outside years
        // 0000-9999 are resolved here rather than compared as strings.
        if let Some(start) = filter.lower_bound() {
            if start.year() > 9999 {
                sql.push_str(" AND 0");
            } else if start.year() >= 0 {
                sql.push_str(" AND timestamp >= ?");
                args.push(SqlValue::Text(format_timestamp(&start)));
            }
        }
        if let Some(end) = filter.upper_bound() {
            if end.year() < 0 {
                sql.push_str(" AND 0");
            } else if end.year() <= 9999 {
                sql.push_str(" AND timestamp <= ?");
                args.push(SqlValue::Text(format_timestamp(&end)));
            }
        }
        sql.push_str(" ORDER BY id ASC LIMIT ?");
        let limit = filter
            .limit
            .and_then(|limit| i64::try_from(limit).ok())
            .unwrap_or(-1);
        args.push(SqlValue::Integer(limit));

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), row_to_entry)?;
            let entries = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
    }

    async fn fork_groups(&self, company: CompanyId) -> Result<Vec<ForkGroup>, StorageError> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT previous_hash, GROUP_CONCAT(id) FROM audit_logs
                 WHERE company_id = ?1
                 GROUP BY IFNULL(previous_hash, '')
                 HAVING COUNT(*) > 1",
            )?;
            let rows = stmt.query_map(params![company.get()], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut groups = Vec::new();
            for row in rows {
                let (previous_hash, ids) = row?;
                let mut log_ids = ids
                    .split(',')
                    .map(|id| id.trim().parse::<i64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|err| StorageError::internal(&format!("fork ids: {err}")))?;
                log_ids.sort_unstable();
                groups.push(ForkGroup {
                    previous_hash,
                    log_ids,
                });
            }
            groups.sort_by_key(|group| group.log_ids.first().copied());
            Ok(groups)
        })
        .await
    }

    async fn count(&self, company: CompanyId) -> Result<u64, StorageError> {
        self.blocking(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM audit_logs WHERE company_id = ?1",
                params![company.get()],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn record(
        &self,
        company: CompanyId,
        table: &str,
        id: &str,
    ) -> Result<Option<Value>, StorageError> {
        let table = table.to_string();
        let id = id.to_string();
        self.blocking(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT value FROM records WHERE company_id = ?1 AND tbl = ?2 AND id = ?3",
                    params![company.get(), table, id],
                    |row| row.get(0),
                )
                .optional()?;
            raw.map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|err| StorageError::internal(&format!("record value: {err}")))
            })
            .transpose()
        })
        .await
    }
}
