use std::sync::Arc;

use chrono::{TimeZone, Utc};
use fleetguard_audit_ledger::{
    chain_hash, AuditAction, AuditDraft, AuditLogEntry, AuditLogFilter, HashedFields, Ledger,
    LedgerError, LedgerStore, MemoryLedgerStore, RecordWrite, RetryPolicy, SqliteLedgerStore,
    StoreTransaction,
};
use fleetguard_core_types::{CompanyId, EntityId, UserId};
use rusqlite::{params, Connection};
use serde_json::json;
use tempfile::tempdir;

const COMPANY: CompanyId = CompanyId(3);

fn draft(action: AuditAction, entity_type: &str, entity_id: i64) -> AuditDraft {
    AuditDraft::new(COMPANY, UserId(1), action, entity_type, EntityId(entity_id))
        .changes(json!({"entity": entity_id, "notes": ["a", "b"], "ratio": 0.5}))
}

fn assert_linked(chain: &[AuditLogEntry]) {
    let mut previous: Option<String> = None;
    for (idx, entry) in chain.iter().enumerate() {
        assert_eq!(entry.id, idx as i64 + 1);
        assert_eq!(entry.previous_hash, previous);
        let expected =
            chain_hash(&HashedFields::from(entry), entry.previous_hash.as_deref()).unwrap();
        assert_eq!(entry.current_hash, expected, "entry {}", entry.id);
        previous = Some(entry.current_hash.clone());
    }
}

#[tokio::test]
async fn entries_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    let written = {
        let store = SqliteLedgerStore::open(&path).unwrap();
        let ledger = Ledger::new(Arc::new(store));
        let first = ledger
            .record(
                draft(AuditAction::InspectionCreated, "inspection", 42),
                vec![RecordWrite::put("inspections", "42", json!({"status": "SUBMITTED"}))],
            )
            .await
            .unwrap();
        let second = ledger
            .append(draft(AuditAction::DefectCreated, "defect", 7))
            .await
            .unwrap();
        vec![first, second]
    };

    let store = SqliteLedgerStore::open(&path).unwrap();
    assert_eq!(store.path(), Some(path.as_path()));
    let read = store.page(COMPANY, 0, 100).await.unwrap();
    assert_eq!(read, written);
    assert_linked(&read);
    assert_eq!(
        store.record(COMPANY, "inspections", "42").await.unwrap(),
        Some(json!({"status": "SUBMITTED"}))
    );

    let ledger = Ledger::new(Arc::new(store));
    let third = ledger
        .append(draft(AuditAction::DefectClosed, "defect", 7))
        .await
        .unwrap();
    assert_eq!(third.id, 3);
    assert_eq!(third.previous_hash, Some(written[1].current_hash.clone()));
}

#[tokio::test]
async fn schema_rejects_forks_and_edits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let store = SqliteLedgerStore::open(&path).unwrap();
    let ledger = Ledger::new(Arc::new(store));
    let genesis = ledger
        .append(draft(AuditAction::UserCreated, "user", 5))
        .await
        .unwrap();

    let raw = Connection::open(&path).unwrap();
    let second_genesis = raw.execute(
        "INSERT INTO audit_logs (company_id, id, user_id, action, entity_type, entity_id,
                                 timestamp, changes, previous_hash, current_hash)
         VALUES (?1, 2, 1, 'LOGIN', 'session', 1, '2024-01-01T00:00:00.000Z', 'null', NULL, ?2)",
        params![COMPANY.get(), "f".repeat(64)],
    );
    assert!(second_genesis.is_err());

    let edit = raw.execute(
        "UPDATE audit_logs SET changes = '{}' WHERE company_id = ?1 AND id = 1",
        params![COMPANY.get()],
    );
    assert!(edit.is_err());

    let delete = raw.execute(
        "DELETE FROM audit_logs WHERE company_id = ?1",
        params![COMPANY.get()],
    );
    assert!(delete.is_err());

    let chain = ledger.store().page(COMPANY, 0, 10).await.unwrap();
    assert_eq!(chain, vec![genesis]);
}

#[tokio::test]
async fn stale_tail_is_a_conflict() {
    let store = SqliteLedgerStore::in_memory().unwrap();
    let ledger = Ledger::new(Arc::new(store.clone()));
    let first = ledger
        .append(draft(AuditAction::Login, "session", 1))
        .await
        .unwrap();

    // A second genesis staged directly against the store loses to the tail.
    let mut forged = first.clone();
    forged.user_id = UserId(2);
    let mut tx = store.begin(COMPANY).await.unwrap();
    tx.stage_entry(forged);
    let err = tx.commit().await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(store.count(COMPANY).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_connections_share_one_chain() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let retry = RetryPolicy {
        max_attempts: 50,
        base_ms: 1,
        factor: 2.0,
        jitter: 0.5,
        cap_ms: 20,
    };
    let a = Ledger::new(Arc::new(SqliteLedgerStore::open(&path).unwrap())).with_retry(retry.clone());
    let b = Ledger::new(Arc::new(SqliteLedgerStore::open(&path).unwrap())).with_retry(retry);

    let mut handles = Vec::new();
    for n in 0..12 {
        let ledger = if n % 2 == 0 { a.clone() } else { b.clone() };
        handles.push(tokio::spawn(async move {
            ledger
                .append(draft(AuditAction::TimesheetApproved, "timesheet", n))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let chain = a.store().page(COMPANY, 0, 100).await.unwrap();
    assert_eq!(chain.len(), 12);
    assert_linked(&chain);
    assert!(a.fork_groups(COMPANY).await.unwrap().is_empty());
}

#[tokio::test]
async fn filters_run_in_sql() {
    let store = SqliteLedgerStore::in_memory().unwrap();
    let ledger = Ledger::new(Arc::new(store));
    for (action, entity_type, id) in [
        (AuditAction::DefectCreated, "defect", 1),
        (AuditAction::PartsUsed, "parts", 4),
        (AuditAction::DefectRectified, "defect", 1),
        (AuditAction::DefectCreated, "defect", 2),
    ] {
        ledger.append(draft(action, entity_type, id)).await.unwrap();
    }

    let created = ledger
        .get_audit_logs(&AuditLogFilter::company(COMPANY).action(AuditAction::DefectCreated))
        .await
        .unwrap();
    assert_eq!(created.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 4]);

    let first_defect = ledger
        .get_audit_logs(
            &AuditLogFilter::company(COMPANY)
                .entity_type("defect")
                .entity_id(EntityId(1))
                .user(UserId(1))
                .limit(1),
        )
        .await
        .unwrap();
    assert_eq!(first_defect.len(), 1);
    assert_eq!(first_defect[0].action, AuditAction::DefectCreated);

    let nobody = ledger
        .get_audit_logs(&AuditLogFilter::company(COMPANY).user(UserId(2)))
        .await
        .unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn five_digit_years_are_refused_before_commit() {
    let ledger = Ledger::new(Arc::new(SqliteLedgerStore::in_memory().unwrap()));
    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

    let err = ledger
        .append(draft(AuditAction::DefectCreated, "defect", 1).at(far))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Invalid(_)), "{err}");

    let entry = ledger
        .append(draft(AuditAction::DefectCreated, "defect", 1))
        .await
        .unwrap();
    assert_eq!(entry.id, 1);
    assert_eq!(entry.previous_hash, None);
    assert_eq!(ledger.count(COMPANY).await.unwrap(), 1);
}

#[tokio::test]
async fn date_filters_agree_across_stores() {
    let noon = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let at = |millis: i64, micros: i64| {
        noon + chrono::Duration::milliseconds(millis) + chrono::Duration::microseconds(micros)
    };
    let stores: Vec<(&str, Arc<dyn LedgerStore>)> = vec![
        ("memory", Arc::new(MemoryLedgerStore::new())),
        ("sqlite", Arc::new(SqliteLedgerStore::in_memory().unwrap())),
    ];
    let far = Utc.with_ymd_and_hms(10001, 1, 1, 0, 0, 0).unwrap();
    let ancient = Utc.with_ymd_and_hms(-5, 1, 1, 0, 0, 0).unwrap();

    for (name, store) in stores {
        let ledger = Ledger::new(store);
        for millis in [0, 2] {
            ledger
                .append(draft(AuditAction::PartsUsed, "parts", millis).at(at(millis, 0)))
                .await
                .unwrap();
        }
        let ids = |filter: AuditLogFilter| {
            let ledger = ledger.clone();
            async move {
                ledger
                    .get_audit_logs(&filter)
                    .await
                    .unwrap()
                    .iter()
                    .map(|e| e.id)
                    .collect::<Vec<_>>()
            }
        };

        let base = AuditLogFilter::company(COMPANY);
        assert_eq!(ids(base.clone().since(at(0, 500))).await, vec![2], "{name}");
        assert_eq!(ids(base.clone().since(at(0, 0))).await, vec![1, 2], "{name}");
        assert_eq!(ids(base.clone().until(at(1, 999))).await, vec![1], "{name}");
        assert_eq!(ids(base.clone().until(at(2, 0))).await, vec![1, 2], "{name}");
        assert!(ids(base.clone().since(far)).await.is_empty(), "{name}");
        assert_eq!(ids(base.clone().until(far)).await, vec![1, 2], "{name}");
        assert_eq!(ids(base.clone().since(ancient)).await, vec![1, 2], "{name}");
        assert!(ids(base.clone().until(ancient)).await.is_empty(), "{name}");
    }
}
