use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use fleetguard_audit_ledger::{AuditAction, AuditDraft, Ledger, MemoryLedgerStore};
use fleetguard_cli::metrics::{global_registry, register_metrics, router};
use fleetguard_core_types::{CompanyId, EntityId, UserId};
use tower::ServiceExt;

#[tokio::test]
async fn metrics_endpoint_exposes_ledger_counters() {
    register_metrics();
    let ledger = Ledger::new(Arc::new(MemoryLedgerStore::new()));
    ledger
        .append(AuditDraft::new(
            CompanyId(1),
            UserId(1),
            AuditAction::VehicleCreated,
            "vehicle",
            EntityId(1),
        ))
        .await
        .unwrap();

    let app = router(Arc::new(global_registry().clone()));
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("fleetguard_ledger_appends_total"), "{text}");
}
