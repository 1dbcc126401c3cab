//! Binds a principal id into a connection's security variable.

use rowguard_core::config::session::is_valid_variable_name;
use rowguard_core::{BindScope, Principal, SessionConfig};

use crate::connection::{ConnectionError, ConnectionId, ContextConnection, ContextStatement};
use crate::error::SessionError;

/// Longest principal id accepted for binding.
pub const MAX_PRINCIPAL_ID_BYTES: usize = 256;

/// What is bound on one checked-out connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub connection_id: ConnectionId,
    pub variable_name: String,
    pub bound_value: String,
    pub scope: BindScope,
}

/// Issues the parameterized statements that set and clear the security variable.
///
/// The principal id is always a bound parameter of `set_config`; there is no
/// code path that formats it into SQL text.
#[derive(Debug, Clone)]
pub struct ContextBinder {
    variable: String,
    scope: BindScope,
}

impl ContextBinder {
    pub fn new(variable: impl Into<String>, scope: BindScope) -> Result<Self, SessionError> {
        let variable = variable.into();
        if !is_valid_variable_name(&variable) {
            return Err(SessionError::InvalidVariable(variable));
        }
        Ok(Self { variable, scope })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        Self::new(config.variable.clone(), config.scope)
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn scope(&self) -> BindScope {
        self.scope
    }

    /// Reject ids that must never reach the database.
    pub fn check_principal(&self, principal: &Principal) -> Result<(), SessionError> {
        let id = principal.id.as_str();
        if id.trim().is_empty() {
            return Err(SessionError::InvalidPrincipal(
                "principal id is empty".to_string(),
            ));
        }
        if id.len() > MAX_PRINCIPAL_ID_BYTES {
            return Err(SessionError::InvalidPrincipal(format!(
                "principal id is {} bytes, limit is {}",
                id.len(),
                MAX_PRINCIPAL_ID_BYTES
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(SessionError::InvalidPrincipal(
                "principal id contains control characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Bind `principal.id` on `conn`.
    ///
    /// Transaction scope opens a transaction first so the engine resets the
    /// value at COMMIT/ROLLBACK.
    pub async fn bind<C>(
        &self,
        conn: &mut C,
        principal: &Principal,
    ) -> Result<SessionContext, SessionError>
    where
        C: ContextConnection + ?Sized,
    {
        self.check_principal(principal)?;

        if self.scope.is_local() {
            conn.execute(ContextStatement::Begin)
                .await
                .map_err(SessionError::ContextBinding)?;
        }

        conn.execute(ContextStatement::SetConfig {
            name: &self.variable,
            value: &principal.id,
            is_local: self.scope.is_local(),
        })
        .await
        .map_err(SessionError::ContextBinding)?;

        tracing::debug!(
            connection_id = %conn.id(),
            principal = %principal.id,
            scope = %self.scope,
            "Security context bound"
        );

        Ok(SessionContext {
            connection_id: conn.id().clone(),
            variable_name: self.variable.clone(),
            bound_value: principal.id.clone(),
            scope: self.scope,
        })
    }

    /// Clear after a successful unit of work.
    pub async fn clear<C>(&self, conn: &mut C) -> Result<(), ConnectionError>
    where
        C: ContextConnection + ?Sized,
    {
        match self.scope {
            BindScope::Transaction => conn.execute(ContextStatement::Commit).await,
            BindScope::Session => {
                conn.execute(ContextStatement::Reset {
                    name: &self.variable,
                })
                .await
            }
        }
    }

    /// Clear after a failed unit of work.
    pub async fn abort<C>(&self, conn: &mut C) -> Result<(), ConnectionError>
    where
        C: ContextConnection + ?Sized,
    {
        match self.scope {
            BindScope::Transaction => conn.execute(ContextStatement::Rollback).await,
            BindScope::Session => {
                conn.execute(ContextStatement::Reset {
                    name: &self.variable,
                })
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionSource;
    use crate::testing::{MemoryPool, principal};

    #[test]
    fn test_invalid_variable_rejected() {
        assert!(matches!(
            ContextBinder::new("current_user_id", BindScope::Session),
            Err(SessionError::InvalidVariable(_))
        ));
        assert!(ContextBinder::new("app.current_user_id", BindScope::Session).is_ok());
    }

    #[tokio::test]
    async fn test_empty_principal_issues_no_statements() {
        let pool = MemoryPool::new(1);
        let mut conn = pool.acquire().await.unwrap();
        let binder = ContextBinder::new("app.current_user_id", BindScope::Transaction).unwrap();

        let err = binder.bind(&mut conn, &principal("")).await.unwrap_err();

        assert!(matches!(err, SessionError::InvalidPrincipal(_)));
        assert_eq!(conn.statement_count(), 0);
        assert_eq!(conn.visible_setting("app.current_user_id"), None);
    }

    #[tokio::test]
    async fn test_malformed_principals_rejected() {
        let binder = ContextBinder::new("app.current_user_id", BindScope::Session).unwrap();
        assert!(binder.check_principal(&principal("   ")).is_err());
        assert!(binder.check_principal(&principal("a\0b")).is_err());
        assert!(binder.check_principal(&principal(&"x".repeat(257))).is_err());
        assert!(binder.check_principal(&principal("user-1")).is_ok());
    }

    #[tokio::test]
    async fn test_transaction_bind_statements() {
        let pool = MemoryPool::new(1);
        let mut conn = pool.acquire().await.unwrap();
        let binder = ContextBinder::new("app.current_user_id", BindScope::Transaction).unwrap();

        let ctx = binder.bind(&mut conn, &principal("alice")).await.unwrap();

        assert_eq!(ctx.bound_value, "alice");
        assert_eq!(ctx.variable_name, "app.current_user_id");
        assert_eq!(&ctx.connection_id, conn.id());
        assert_eq!(conn.statement_log(), vec!["BEGIN", "SET_CONFIG"]);
        assert_eq!(conn.visible_setting("app.current_user_id").as_deref(), Some("alice"));

        binder.clear(&mut conn).await.unwrap();
        assert_eq!(conn.visible_setting("app.current_user_id"), None);
    }

    #[tokio::test]
    async fn test_session_bind_is_single_statement() {
        let pool = MemoryPool::new(1);
        let mut conn = pool.acquire().await.unwrap();
        let binder = ContextBinder::new("app.current_user_id", BindScope::Session).unwrap();

        binder.bind(&mut conn, &principal("bob")).await.unwrap();
        assert_eq!(conn.statement_log(), vec!["SET_CONFIG"]);

        binder.abort(&mut conn).await.unwrap();
        assert_eq!(conn.statement_log(), vec!["SET_CONFIG", "RESET"]);
        assert_eq!(conn.visible_setting("app.current_user_id"), None);
    }

    #[tokio::test]
    async fn test_hostile_id_is_bound_verbatim() {
        let pool = MemoryPool::new(1);
        let mut conn = pool.acquire().await.unwrap();
        let binder = ContextBinder::new("app.current_user_id", BindScope::Session).unwrap();

        let hostile = "x'; RESET ALL; SELECT '";
        binder.bind(&mut conn, &principal(hostile)).await.unwrap();

        assert_eq!(conn.visible_setting("app.current_user_id").as_deref(), Some(hostile));
        assert_eq!(conn.statement_count(), 1);
    }
}
