//! Error types for the session crate.

use std::time::Duration;

use thiserror::Error;

use crate::connection::ConnectionError;
use crate::guard::ContextState;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The principal id cannot be bound. Raised before any statement is issued.
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    /// The bind statement failed; the connection has been discarded.
    #[error("failed to bind security context: {0}")]
    ContextBinding(#[source] ConnectionError),

    /// Clearing failed; the connection has been discarded.
    #[error("failed to clear security context: {0}")]
    ContextRelease(#[source] ConnectionError),

    #[error("failed to acquire connection: {0}")]
    Acquire(#[source] ConnectionError),

    /// The unit of work exceeded its deadline; the connection has been discarded.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid security variable name '{0}'")]
    InvalidVariable(String),

    #[error("invalid context state transition {from} -> {to}")]
    InvalidTransition { from: ContextState, to: ContextState },
}
