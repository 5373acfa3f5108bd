//! axum glue: rejections render as JSON responses and a guard chain can be
//! mounted as route middleware.
//!
//! ```ignore
//! let chain = Arc::new(GuardChain::new().with(require_permission(Permission::DefectAssign)));
//! let app = Router::new()
//!     .route("/defects/:id/assign", post(assign))
//!     .route_layer(middleware::from_fn_with_state(chain, enforce));
//! ```

use std::sync::Arc;

use axum::extract::{RawPathParams, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fleetguard_core_types::{Principal, PrincipalClaims};
use serde_json::Value;

use crate::chain::GuardChain;
use crate::context::GateContext;
use crate::errors::GateRejection;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let status = fleetguard_errors::render::to_http_status(self.error_obj());
        (status, Json(self.body().clone())).into_response()
    }
}

/// Builds the gate context for an incoming request.
///
/// The principal comes from request extensions, placed there by the session
/// layer either as a resolved [`Principal`] or as raw [`PrincipalClaims`].
/// Path parameters take precedence over query parameters of the same name.
pub fn context_from_request(req: &Request, path: Option<&RawPathParams>) -> GateContext {
    let mut cx = match req.extensions().get::<Principal>() {
        Some(principal) => GateContext::new(principal.clone()),
        None => GateContext::from_claims(req.extensions().get::<PrincipalClaims>().cloned()),
    };

    if let Some(id) = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        cx = cx.with_request_id(id);
    }

    if let Some(query) = req.uri().query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            cx.params
                .insert(key.into_owned(), Value::String(value.into_owned()));
        }
    }

    if let Some(params) = path {
        for (key, value) in params {
            cx.params
                .insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    cx
}

/// Route middleware running `chain` before the inner handler.
///
/// On success the [`GateContext`] is inserted into the request extensions.
pub async fn enforce(
    State(chain): State<Arc<GuardChain>>,
    path: Option<RawPathParams>,
    mut req: Request,
    next: Next,
) -> Response {
    let cx = context_from_request(&req, path.as_ref());
    if let Err(rejection) = chain.check(&cx) {
        return rejection.into_response();
    }
    req.extensions_mut().insert(cx);
    next.run(req).await
}
