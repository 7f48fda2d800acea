//! The error taxonomy of spec §7. Each variant maps to one of the five
//! recovery strategies; callers match on kind rather than string-matching
//! messages.

use thiserror::Error;

/// Transient external failure: K8s conflict, API throttle, HTTP 5xx,
/// network timeout. Recovery: backoff and re-enqueue.
#[derive(Debug, Error)]
#[error("transient error: {0}")]
pub struct TransientError(pub String);

/// Schema/regex/template failure on user input. Recovery: attach a
/// rejection condition and continue with sibling resources.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{reason}: {message}")]
pub struct ValidationError {
    pub reason: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: message.into(),
        }
    }
}

/// An unresolved `BackendRef`/`SecretRef`/`ExtensionRef`, or a cross
/// namespace reference lacking a `ReferenceGrant`. Recovery: mark
/// `ResolvedRefs=False` and skip the dependent rule (spec §4.3, §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("cross-namespace reference from {from_namespace} to {to_namespace}/{to_name} is not permitted by any ReferenceGrant")]
    NotPermitted {
        from_namespace: String,
        to_namespace: String,
        to_name: String,
    },
    #[error("port must be specified for backend {namespace}/{name}")]
    MissingPort { namespace: String, name: String },
    #[error("backend {namespace}/{name} has no port {port}")]
    UnknownPort {
        namespace: String,
        name: String,
        port: u16,
    },
}

/// An internal inconsistency discovered during translation. Recovery is
/// governed by `ValidationMode`: `Standard` drops the offending route,
/// `Strict` fails the enclosing listener.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("translation error: {0}")]
pub struct TranslationError(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Standard,
    Strict,
}
