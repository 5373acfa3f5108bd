use crate::{
    kind::{ErrorKind, RetryClass, Severity},
    model::ErrorObj,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// What an API consumer sees. Developer messages and metadata stay
/// server-side.
#[derive(Debug, Serialize)]
pub struct PublicErrorView {
    pub error: &'static str,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Full rendering for administrative and compliance tooling.
#[derive(Debug, Serialize)]
pub struct AuditErrorView {
    pub code: &'static str,
    pub kind: &'static str,
    pub http_status: u16,
    pub retryable: &'static str,
    pub severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_dev: Option<String>,
    pub meta: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ErrorObj {
    pub fn to_public(&self) -> PublicErrorView {
        PublicErrorView {
            error: self.kind.taxonomy(),
            code: self.code.0,
            message: self.message_user.clone(),
            correlation_id: self.correlation_id.clone(),
        }
    }

    pub fn to_audit(&self) -> AuditErrorView {
        AuditErrorView {
            code: self.code.0,
            kind: ErrorKind::as_str(self.kind),
            http_status: self.http_status,
            retryable: RetryClass::as_str(self.retryable),
            severity: Severity::as_str(self.severity),
            message_dev: self.message_dev.clone(),
            meta: self.meta.clone(),
            correlation_id: self.correlation_id.clone(),
        }
    }
}

#[cfg(feature = "http")]
pub fn to_http_status(err: &ErrorObj) -> http::StatusCode {
    http::StatusCode::from_u16(err.http_status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
}
