pub use crate::{
    code::{codes, spec_of, CodeSpec, ErrorCode, REGISTRY},
    kind::{ErrorKind, RetryClass, Severity},
    model::{ErrorBuilder, ErrorObj},
    render::{AuditErrorView, PublicErrorView},
};
