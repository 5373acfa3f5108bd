use fleetguard_authz_gate::prelude::*;
use fleetguard_core_types::PrincipalClaims;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};

fn driver(id: i64) -> GateContext {
    GateContext::new(Principal::new(id, 1, Role::Driver))
}

#[test]
fn driver_is_refused_defect_assignment_admin_passes() {
    let guard = require_permission(Permission::DefectAssign);

    let rejection = guard.check(&driver(5)).unwrap_err();
    assert_eq!(rejection.status(), 403);
    let body = rejection.body();
    assert_eq!(body.error, "AUTHORIZATION_ERROR");
    assert_eq!(body.required_permission, Some(Permission::DefectAssign));
    assert_eq!(body.user_role.as_deref(), Some("DRIVER"));

    let admin = GateContext::new(Principal::new(1, 1, Role::Admin));
    assert!(guard.check(&admin).is_ok());
}

#[test]
fn denials_carry_the_request_id() {
    let cx = driver(5).with_request_id("req-77");
    let rejection = require_permission(Permission::DefectAssign)
        .check(&cx)
        .unwrap_err();
    assert_eq!(rejection.error_obj().correlation_id.as_deref(), Some("req-77"));

    let anonymous = GateContext::anonymous().with_request_id("req-78");
    let rejection = require_auth().check(&anonymous).unwrap_err();
    assert_eq!(rejection.error_obj().correlation_id.as_deref(), Some("req-78"));
}

#[test]
fn ownership_is_enforced_except_for_universal_owners() {
    let guard = require_resource_ownership("driverId");

    let other = driver(5).with_param("driverId", 6);
    let rejection = guard.check(&other).unwrap_err();
    assert_eq!(rejection.status(), 403);
    assert_eq!(rejection.body().user_role.as_deref(), Some("DRIVER"));

    assert!(guard.check(&driver(5).with_param("driverId", 5)).is_ok());
    assert!(guard.check(&driver(5).with_param("driverId", "5")).is_ok());

    let manager = GateContext::new(Principal::new(2, 1, Role::TransportManager))
        .with_param("driverId", 6);
    assert!(guard.check(&manager).is_ok());
}

#[test]
fn missing_owner_field_is_a_mismatch() {
    let guard = require_resource_ownership("driverId");
    let rejection = guard.check(&driver(5)).unwrap_err();
    assert_eq!(rejection.status(), 403);

    let junk = driver(5).with_param("driverId", json!({"id": 5}));
    assert!(guard.check(&junk).is_err());
}

#[test]
fn every_guard_answers_401_without_a_principal() {
    let anonymous = GateContext::anonymous();
    let guards: Vec<Box<dyn Guard>> = vec![
        Box::new(require_auth()),
        Box::new(require_permission(Permission::InspectionView)),
        Box::new(require_any_permission(vec![Permission::InspectionView])),
        Box::new(require_all_permissions(vec![Permission::InspectionView])),
        Box::new(require_role(Role::Admin)),
        Box::new(require_any_role(vec![Role::Admin])),
        Box::new(require_resource_ownership("driverId")),
    ];
    for guard in guards {
        let rejection = guard.check(&anonymous).unwrap_err();
        assert_eq!(rejection.status(), 401, "{}", guard.name());
        assert_eq!(rejection.body().error, "AUTHENTICATION_ERROR");
        assert!(rejection.body().user_role.is_none());
    }
}

#[test]
fn any_and_all_permission_guards_compose() {
    let cx = driver(5);
    let mixed = vec![Permission::DefectCreate, Permission::DefectAssign];

    assert!(require_any_permission(mixed.clone()).check(&cx).is_ok());

    let rejection = require_all_permissions(mixed.clone()).check(&cx).unwrap_err();
    assert_eq!(rejection.body().required_permissions.as_deref(), Some(&mixed[..]));

    let none = require_any_permission(Vec::new()).check(&cx).unwrap_err();
    assert_eq!(none.status(), 403);
    assert!(require_all_permissions(Vec::new()).check(&cx).is_ok());
}

#[test]
fn role_gates_ignore_the_permission_table() {
    let auditor = GateContext::new(Principal::new(3, 1, Role::Auditor));

    let rejection = require_role(Role::Admin).check(&auditor).unwrap_err();
    assert_eq!(rejection.body().required_role, Some(Role::Admin));

    assert!(require_any_role(vec![Role::Admin, Role::Auditor])
        .check(&auditor)
        .is_ok());
}

#[test]
fn unknown_session_role_is_authenticated_but_holds_nothing() {
    let claims = PrincipalClaims {
        id: 9,
        company_id: 1,
        role: "OWNER".into(),
    };
    let cx = GateContext::from_claims(Some(claims)).with_param("driverId", 9);
    assert!(cx.principal.is_none());
    assert!(cx.is_authenticated());
    assert!(require_auth().check(&cx).is_ok());

    let guards: Vec<Box<dyn Guard>> = vec![
        Box::new(require_permission(Permission::InspectionView)),
        Box::new(require_any_permission(vec![Permission::InspectionView])),
        Box::new(require_all_permissions(vec![Permission::InspectionView])),
        Box::new(require_role(Role::Driver)),
        Box::new(require_any_role(Role::ALL.to_vec())),
        Box::new(require_resource_ownership("driverId")),
    ];
    for guard in guards {
        let rejection = guard.check(&cx).unwrap_err();
        assert_eq!(rejection.status(), 403, "{}", guard.name());
        assert_eq!(rejection.body().error, "AUTHORIZATION_ERROR");
        assert_eq!(rejection.body().user_role.as_deref(), Some("OWNER"));
    }

    let rejection = require_permission(Permission::InspectionView)
        .check(&cx)
        .unwrap_err();
    assert_eq!(
        rejection.body().required_permission,
        Some(Permission::InspectionView)
    );

    let anonymous = GateContext::from_claims(None);
    assert!(!anonymous.is_authenticated());
    assert_eq!(require_auth().check(&anonymous).unwrap_err().status(), 401);
}

#[tokio::test]
async fn chain_short_circuits_on_first_denial() {
    let chain = GuardChain::new()
        .with(require_auth())
        .with(require_permission(Permission::TimesheetCreate))
        .with(require_resource_ownership("driverId"));

    let ran = AtomicBool::new(false);
    let flag = &ran;
    let result = chain
        .run(driver(5).with_param("driverId", 6), move |_| async move {
            flag.store(true, Ordering::SeqCst);
        })
        .await;
    assert!(result.is_err());
    assert!(!ran.load(Ordering::SeqCst));

    let value = chain
        .run(driver(5).with_param("driverId", 5), |cx| async move {
            cx.principal.map(|p| p.id.get())
        })
        .await
        .unwrap();
    assert_eq!(value, Some(5));
}
