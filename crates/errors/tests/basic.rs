use fleetguard_errors::prelude::*;
use serde_json::json;

#[test]
fn forbidden_renders_public_view_without_dev_message() {
    let err = ErrorBuilder::new(codes::AUTH_FORBIDDEN)
        .user_msg("Insufficient permissions")
        .dev_msg("role DRIVER lacks DEFECT_ASSIGN")
        .meta_kv("tenant", json!(7))
        .build()
        .with_correlation("req-1");

    assert_eq!(err.http_status, 403);
    assert_eq!(err.kind, ErrorKind::Authorization);

    let public = serde_json::to_value(err.to_public()).unwrap();
    assert_eq!(
        public,
        json!({
            "error": "AUTHORIZATION_ERROR",
            "code": "AUTH.FORBIDDEN",
            "message": "Insufficient permissions",
            "correlation_id": "req-1"
        })
    );

    let audit = err.to_audit();
    assert_eq!(
        audit.message_dev.as_deref(),
        Some("role DRIVER lacks DEFECT_ASSIGN")
    );
    assert_eq!(audit.severity, "warn");
    assert_eq!(audit.correlation_id.as_deref(), Some("req-1"));
}



#[test]
fn every_code_is_registered_with_expected_status() {
    let expected = [
        (codes::AUTH_UNAUTHENTICATED, 401),
        (codes::AUTH_FORBIDDEN, 403),
        (codes::SCHEMA_VALIDATION, 422),
        (codes::LEDGER_INTEGRITY_VIOLATION, 409),
        (codes::STORAGE_NOT_FOUND, 404),
        (codes::STORAGE_CONFLICT, 409),
        (codes::STORAGE_UNAVAILABLE, 503),
        (codes::UNKNOWN_INTERNAL, 500),
    ];
    assert_eq!(REGISTRY.len(), expected.len());
    for (code, status) in expected {
        assert_eq!(spec_of(code).http_status, status, "{}", code.as_str());
    }
}

#[test]
fn default_user_message_is_used_when_none_given() {
    let err = ErrorBuilder::new(codes::STORAGE_UNAVAILABLE).build();
    assert_eq!(
        err.message_user,
        "Storage backend is unavailable. Please retry later."
    );
    assert!(err.is_retryable());
    assert!(err.correlation_id.is_none());
}

#[test]
fn error_code_deserializes_only_registered_values() {
    let code: ErrorCode = serde_json::from_value(json!("AUTH.UNAUTHENTICATED")).unwrap();
    assert_eq!(code, codes::AUTH_UNAUTHENTICATED);
    assert!(serde_json::from_value::<ErrorCode>(json!("NOPE.NEVER")).is_err());
}
