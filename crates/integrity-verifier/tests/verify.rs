use std::sync::Arc;

use fleetguard_audit_ledger::{
    chain_hash, AuditAction, AuditDraft, AuditLogEntry, HashedFields, Ledger, LedgerStore,
    MemoryLedgerStore, SqliteLedgerStore,
};
use fleetguard_core_types::{CompanyId, EntityId, UserId};
use fleetguard_integrity::{BreakReason, Verifier};
use rusqlite::{params, Connection};
use serde_json::json;
use tempfile::tempdir;

const COMPANY: CompanyId = CompanyId(21);

fn draft(company: CompanyId, n: i64) -> AuditDraft {
    AuditDraft::new(
        company,
        UserId(1),
        AuditAction::InspectionUpdated,
        "inspection",
        EntityId(n),
    )
    .changes(json!({"step": n}))
}

async fn seeded(n: i64) -> (MemoryLedgerStore, Ledger, Verifier) {
    let store = MemoryLedgerStore::new();
    let ledger = Ledger::new(Arc::new(store.clone()));
    for i in 0..n {
        ledger.append(draft(COMPANY, i)).await.unwrap();
    }
    let verifier = Verifier::for_ledger(&ledger);
    (store, ledger, verifier)
}

fn broken_ids(report: &fleetguard_integrity::IntegrityReport) -> Vec<i64> {
    report.broken_chains.iter().map(|b| b.log_id).collect()
}

#[tokio::test]
async fn two_entry_chain_is_valid() {
    let store = MemoryLedgerStore::new();
    let ledger = Ledger::new(Arc::new(store));
    ledger
        .append(
            AuditDraft::new(COMPANY, UserId(1), AuditAction::InspectionCreated, "inspection", EntityId(42))
                .changes(json!({"status": "SUBMITTED"})),
        )
        .await
        .unwrap();
    ledger
        .append(
            AuditDraft::new(COMPANY, UserId(1), AuditAction::DefectCreated, "defect", EntityId(7))
                .changes(json!({"severity": "MINOR"})),
        )
        .await
        .unwrap();

    let report = Verifier::for_ledger(&ledger).verify(COMPANY).await.unwrap();
    assert!(report.is_valid);
    assert_eq!(report.total_logs, 2);
    assert!(report.broken_chains.is_empty());
    assert!(report.forks.is_empty());
}

#[tokio::test]
async fn empty_chain_is_valid() {
    let (_, _, verifier) = seeded(0).await;
    let report = verifier.verify(COMPANY).await.unwrap();
    assert!(report.is_valid);
    assert_eq!(report.total_logs, 0);
}

#[tokio::test]
async fn edited_payload_reports_only_that_entry() {
    let (store, _, verifier) = seeded(5).await;
    assert!(store.tamper(COMPANY, 3, |entry| entry.changes = json!({"step": 99})));

    let report = verifier.verify(COMPANY).await.unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.total_logs, 5);
    assert_eq!(broken_ids(&report), vec![3]);
    assert_eq!(report.broken_chains[0].reason, BreakReason::HashMismatch);
    assert_ne!(
        report.broken_chains[0].expected_hash,
        report.broken_chains[0].actual_hash
    );
}

#[tokio::test]
async fn rewritten_hash_reports_entry_and_successor() {
    let (store, _, verifier) = seeded(5).await;
    store.tamper(COMPANY, 2, |entry| {
        entry.entity_type = "vehicle".into();
        entry.current_hash =
            chain_hash(&HashedFields::from(&*entry), entry.previous_hash.as_deref()).unwrap();
    });

    let report = verifier.verify(COMPANY).await.unwrap();
    assert_eq!(broken_ids(&report), vec![3]);

    store.tamper(COMPANY, 4, |entry| entry.current_hash = "0".repeat(64));
    let report = verifier.verify(COMPANY).await.unwrap();
    assert_eq!(broken_ids(&report), vec![3, 4, 5]);
}

#[tokio::test]
async fn rewritten_link_is_reported() {
    let (store, _, verifier) = seeded(4).await;
    store.tamper(COMPANY, 2, |entry| entry.previous_hash = Some("a".repeat(64)));

    let report = verifier.verify(COMPANY).await.unwrap();
    assert_eq!(broken_ids(&report), vec![2]);
    assert_eq!(report.broken_chains[0].reason, BreakReason::LinkMismatch);
}

#[tokio::test]
async fn forks_are_reported_separately() {
    let (store, _, verifier) = seeded(3).await;
    let chain = store.page(COMPANY, 0, 10).await.unwrap();

    let mut rogue = AuditLogEntry {
        id: 4,
        changes: json!({"rogue": true}),
        ..chain[2].clone()
    };
    rogue.previous_hash = Some(chain[1].current_hash.clone());
    rogue.current_hash =
        chain_hash(&HashedFields::from(&rogue), rogue.previous_hash.as_deref()).unwrap();
    store.insert_unchecked(rogue);

    let report = verifier.verify(COMPANY).await.unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.total_logs, 4);
    assert!(report.broken_chains.is_empty());
    assert_eq!(report.forks.len(), 1);
    assert_eq!(report.forks[0].log_ids, vec![3, 4]);
    assert_eq!(report.forks[0].previous_hash, Some(chain[1].current_hash.clone()));
}

#[tokio::test]
async fn two_genesis_entries_are_a_fork() {
    let (store, _, verifier) = seeded(1).await;
    let genesis = store.page(COMPANY, 0, 1).await.unwrap().remove(0);
    let mut second = AuditLogEntry {
        id: 2,
        user_id: UserId(9),
        ..genesis
    };
    second.current_hash = chain_hash(&HashedFields::from(&second), None).unwrap();
    store.insert_unchecked(second);

    let report = verifier.verify(COMPANY).await.unwrap();
    assert!(!report.is_valid);
    assert!(report.broken_chains.is_empty());
    assert_eq!(report.forks[0].previous_hash, None);
    assert_eq!(report.forks[0].log_ids, vec![1, 2]);
}

#[tokio::test]
async fn verification_is_idempotent() {
    let (store, _, verifier) = seeded(6).await;
    let clean = verifier.verify(COMPANY).await.unwrap();
    assert_eq!(clean, verifier.verify(COMPANY).await.unwrap());
    assert_eq!(
        clean,
        verifier.verify_audit_log_integrity(COMPANY).await.unwrap()
    );

    store.tamper(COMPANY, 5, |entry| entry.user_id = UserId(77));
    let first = verifier.verify(COMPANY).await.unwrap();
    let second = verifier.verify(COMPANY).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(broken_ids(&first), vec![5]);
}

#[tokio::test]
async fn small_pages_see_the_whole_chain() {
    let (store, _, verifier) = seeded(11).await;
    let verifier = verifier.with_page_size(3);
    assert_eq!(verifier.page_size(), 3);

    let report = verifier.verify(COMPANY).await.unwrap();
    assert!(report.is_valid);
    assert_eq!(report.total_logs, 11);

    store.tamper(COMPANY, 7, |entry| entry.entity_id = EntityId(1000));
    let report = verifier.verify(COMPANY).await.unwrap();
    assert_eq!(broken_ids(&report), vec![7]);
}

#[tokio::test]
async fn tenants_are_verified_independently() {
    let store = MemoryLedgerStore::new();
    let ledger = Ledger::new(Arc::new(store.clone()));
    let other = CompanyId(22);
    for i in 0..3 {
        ledger.append(draft(COMPANY, i)).await.unwrap();
        ledger.append(draft(other, i)).await.unwrap();
    }
    store.tamper(COMPANY, 2, |entry| entry.changes = json!(null));

    let reports = Verifier::for_ledger(&ledger)
        .verify_all([COMPANY, other])
        .await
        .unwrap();
    assert!(!reports[0].is_valid);
    assert!(reports[1].is_valid);
    assert_eq!(reports[1].total_logs, 3);
    assert!(reports[0].summary().contains("BROKEN"));
}

#[tokio::test]
async fn sqlite_tampering_is_detected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let ledger = Ledger::new(Arc::new(SqliteLedgerStore::open(&path).unwrap()));
    for i in 0..4 {
        ledger.append(draft(COMPANY, i)).await.unwrap();
    }
    let verifier = Verifier::for_ledger(&ledger);
    assert!(verifier.verify(COMPANY).await.unwrap().is_valid);

    // Someone with direct database access removes the guards and edits a row.
    let raw = Connection::open(&path).unwrap();
    raw.execute_batch("DROP TRIGGER audit_logs_no_update;").unwrap();
    raw.execute(
        "UPDATE audit_logs SET changes = ?1 WHERE company_id = ?2 AND id = 2",
        params![r#"{"step":42}"#, COMPANY.get()],
    )
    .unwrap();

    let report = verifier.verify(COMPANY).await.unwrap();
    assert!(!report.is_valid);
    assert_eq!(broken_ids(&report), vec![2]);
    assert!(report.violation().is_some());
}
