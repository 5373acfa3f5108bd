use fleetguard_core_types::{Principal, PrincipalClaims};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Everything a guard may look at for one request.
#[derive(Clone, Debug)]
pub struct GateContext {
    pub request_id: String,
    pub principal: Option<Principal>,
    /// Session claims whose role is outside the closed set. The caller is
    /// authenticated but holds no permission and no role.
    pub unclassified: Option<PrincipalClaims>,
    /// Path, query and body values, flattened into one object.
    pub params: Map<String, Value>,
}

impl Default for GateContext {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            principal: None,
            unclassified: None,
            params: Map::new(),
        }
    }
}

impl GateContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            ..Self::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Builds a context from raw session claims.
    ///
    /// Claims with a role outside the closed set are kept as
    /// [`GateContext::unclassified`]: `require_auth` passes, every other
    /// guard answers 403.
    pub fn from_claims(claims: Option<PrincipalClaims>) -> Self {
        let Some(claims) = claims else {
            return Self::anonymous();
        };
        match Principal::try_from(claims.clone()) {
            Ok(principal) => Self::new(principal),
            Err(_) => Self {
                unclassified: Some(claims),
                ..Self::default()
            },
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some() || self.unclassified.is_some()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Merges `params` into the context; later values win.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}
