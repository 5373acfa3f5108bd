//! Shared components wired from configuration.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use fleetguard_audit_ledger::{
    Ledger, LedgerStore, MemoryLedgerStore, SqliteLedgerStore, StorageError,
};
use fleetguard_integrity::Verifier;
use tracing::info;

use crate::config::{FleetGuardConfig, StorageBackend};

pub struct AppContext {
    backend: StorageBackend,
    ledger: Ledger,
    verifier: Verifier,
}

impl AppContext {
    /// Builds the shared components. Opening a sqlite store touches the
    /// filesystem and runs migrations, so it happens on the blocking pool.
    pub async fn from_config(config: &FleetGuardConfig) -> Result<Self, StorageError> {
        let store: Arc<dyn LedgerStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryLedgerStore::new()),
            StorageBackend::Sqlite => {
                let path = config.storage.path.clone();
                let store = tokio::task::spawn_blocking(move || open_sqlite(&path))
                    .await
                    .map_err(|err| {
                        StorageError::internal(&format!("sqlite open task failed: {err}"))
                    })??;
                Arc::new(store)
            }
        };
        info!(backend = ?config.storage.backend, "ledger store ready");
        Ok(Self::with_store(store, config))
    }

    pub fn with_store(store: Arc<dyn LedgerStore>, config: &FleetGuardConfig) -> Self {
        let ledger = Ledger::new(Arc::clone(&store)).with_retry(config.ledger.retry.clone());
        let verifier = Verifier::new(store).with_page_size(config.verifier.page_size);
        Self {
            backend: config.storage.backend,
            ledger,
            verifier,
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }
}

fn open_sqlite(path: &Path) -> Result<SqliteLedgerStore, StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            StorageError::unavailable(&format!("create {}: {err}", parent.display()))
        })?;
    }
    SqliteLedgerStore::open(path)
}

#[cfg(test)]
mod tests {
    use fleetguard_audit_ledger::{AuditAction, AuditDraft};
    use fleetguard_core_types::{CompanyId, EntityId, UserId};

    use super::*;

    #[tokio::test]
    async fn sqlite_context_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FleetGuardConfig::default();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.path = dir.path().join("nested").join("ledger.db");

        let cx = AppContext::from_config(&config).await.unwrap();
        assert_eq!(cx.backend(), StorageBackend::Sqlite);
        assert!(config.storage.path.exists());

        let entry = cx
            .ledger()
            .append(AuditDraft::new(
                CompanyId(1),
                UserId(1),
                AuditAction::VehicleCreated,
                "vehicle",
                EntityId(1),
            ))
            .await
            .unwrap();
        assert_eq!(entry.id, 1);
    }

    #[tokio::test]
    async fn memory_context_touches_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FleetGuardConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.storage.path = dir.path().join("ledger.db");

        let cx = AppContext::from_config(&config).await.unwrap();
        assert_eq!(cx.backend(), StorageBackend::Memory);
        assert!(!config.storage.path.exists());
    }
}
