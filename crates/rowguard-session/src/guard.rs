//! Scoped ownership of one bound connection.

use rowguard_core::Principal;

use crate::binder::{ContextBinder, SessionContext};
use crate::connection::{ConnectionSource, ContextConnection};
use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    Unbound,
    Bound,
    Cleared,
    ConnectionDiscarded,
}

impl ContextState {
    pub fn can_transition_to(self, next: ContextState) -> bool {
        use ContextState::*;
        matches!(
            (self, next),
            (Unbound, Bound)
                | (Unbound, ConnectionDiscarded)
                | (Bound, Cleared)
                | (Bound, ConnectionDiscarded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ContextState::Cleared | ContextState::ConnectionDiscarded)
    }
}

impl std::fmt::Display for ContextState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextState::Unbound => write!(f, "UNBOUND"),
            ContextState::Bound => write!(f, "BOUND"),
            ContextState::Cleared => write!(f, "CLEARED"),
            ContextState::ConnectionDiscarded => write!(f, "CONNECTION_DISCARDED"),
        }
    }
}

/// A checked-out connection carrying one principal's security context.
///
/// The guard is the only way back to the pool: `release` clears first, and a
/// guard dropped while still bound (panic, `?`, cancelled future) closes the
/// physical connection instead of returning it.
pub struct ContextGuard<C: ContextConnection> {
    conn: Option<C>,
    binder: ContextBinder,
    context: Option<SessionContext>,
    state: ContextState,
}

impl<C: ContextConnection> ContextGuard<C> {
    /// Check out a connection from `source` and bind `principal` on it.
    ///
    /// The principal is validated before the pool is touched.
    pub async fn acquire<S>(
        source: &S,
        binder: &ContextBinder,
        principal: &Principal,
    ) -> Result<Self, SessionError>
    where
        S: ConnectionSource<Connection = C> + ?Sized,
    {
        binder.check_principal(principal)?;
        let conn = source.acquire().await.map_err(SessionError::Acquire)?;
        Self::bind(conn, binder, principal).await
    }

    /// Take ownership of an already checked-out connection and bind on it.
    pub async fn bind(
        conn: C,
        binder: &ContextBinder,
        principal: &Principal,
    ) -> Result<Self, SessionError> {
        let mut guard = Self {
            conn: Some(conn),
            binder: binder.clone(),
            context: None,
            state: ContextState::Unbound,
        };

        match binder.bind(guard.connection(), principal).await {
            Ok(context) => {
                guard.transition(ContextState::Bound)?;
                guard.context = Some(context);
                Ok(guard)
            }
            // Nothing was issued; the connection is clean and may go back.
            Err(e @ SessionError::InvalidPrincipal(_)) => Err(e),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    principal = %principal.id,
                    "Binding failed, discarding connection"
                );
                guard.discard_connection();
                Err(e)
            }
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    /// The bound connection, for the request's own queries.
    pub fn connection(&mut self) -> &mut C {
        self.conn
            .as_mut()
            .expect("connection is present until the guard is consumed")
    }

    /// Clear the binding and return the connection to its pool.
    ///
    /// If clearing fails the connection is discarded and the error returned.
    pub async fn release(mut self) -> Result<(), SessionError> {
        let binder = self.binder.clone();
        let result = binder.clear(self.connection()).await;
        self.finish(result, "release")
    }

    /// Undo the unit of work and clear the binding after a failure.
    pub async fn abort(mut self) -> Result<(), SessionError> {
        let binder = self.binder.clone();
        let result = binder.abort(self.connection()).await;
        self.finish(result, "abort")
    }

    /// Close the physical connection without attempting to clear it.
    pub fn discard(mut self) {
        self.discard_connection();
    }

    fn finish(
        &mut self,
        result: Result<(), crate::connection::ConnectionError>,
        op: &'static str,
    ) -> Result<(), SessionError> {
        match result {
            Ok(()) => {
                self.transition(ContextState::Cleared)?;
                tracing::debug!(
                    connection_id = ?self.context.as_ref().map(|c| c.connection_id.to_string()),
                    op,
                    "Security context cleared"
                );
                // Dropping the guard now drops the connection back into its pool.
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, op, "Clearing failed, discarding connection");
                self.discard_connection();
                Err(SessionError::ContextRelease(e))
            }
        }
    }

    fn transition(&mut self, next: ContextState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    fn discard_connection(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.discard();
        }
        self.state = ContextState::ConnectionDiscarded;
    }
}

impl<C: ContextConnection> Drop for ContextGuard<C> {
    fn drop(&mut self) {
        if self.state == ContextState::Bound {
            tracing::warn!(
                connection_id = ?self.context.as_ref().map(|c| c.connection_id.to_string()),
                "Guard dropped while bound, discarding connection"
            );
            self.discard_connection();
        }
    }
}
