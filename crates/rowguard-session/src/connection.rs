//! The seam between the lifecycle guard and a concrete database driver.

use async_trait::async_trait;
use thiserror::Error;

/// Opaque handle identifying one checkout of a physical connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The only statements the binder ever issues.
///
/// Values travel as bound parameters. Implementations must never splice
/// `value` into SQL text; `name` has been validated as `namespace.name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatement<'a> {
    Begin,
    /// `SELECT set_config($1, $2, $3)`
    SetConfig {
        name: &'a str,
        value: &'a str,
        is_local: bool,
    },
    /// `RESET <name>`
    Reset { name: &'a str },
    Commit,
    Rollback,
}

impl ContextStatement<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            ContextStatement::Begin => "BEGIN",
            ContextStatement::SetConfig { .. } => "SET_CONFIG",
            ContextStatement::Reset { .. } => "RESET",
            ContextStatement::Commit => "COMMIT",
            ContextStatement::Rollback => "ROLLBACK",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to acquire connection: {0}")]
    Acquire(String),

    #[error("statement {statement} failed: {message}")]
    Statement {
        statement: &'static str,
        message: String,
    },

    #[error("connection already closed")]
    Closed,
}

/// One physical connection checked out for exactly one request.
///
/// Dropping an implementation must return the connection to its pool; the
/// guard only lets that happen once the security context has been cleared.
#[async_trait]
pub trait ContextConnection: Send {
    fn id(&self) -> &ConnectionId;

    async fn execute(&mut self, statement: ContextStatement<'_>) -> Result<(), ConnectionError>;

    /// Mark the physical connection non-reusable and close it.
    ///
    /// Runs from `Drop`, so it must not block or await.
    fn discard(&mut self);
}

/// A pool handing out [`ContextConnection`]s.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    type Connection: ContextConnection;

    async fn acquire(&self) -> Result<Self::Connection, ConnectionError>;
}
