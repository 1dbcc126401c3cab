use std::time::Duration;

use async_trait::async_trait;
use rowguard_core::UpstreamConfig;
use rowguard_core::config::session::is_valid_variable_name;
use rowguard_session::{
    ConnectionError, ConnectionId, ConnectionSource, ContextConnection, ContextStatement,
};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::{Connection, Executor, PgPool, Postgres};

pub mod introspect;

pub use introspect::PgCatalogIntrospector;

/// Build a plain pool from upstream settings.
pub async fn connect_pool(config: &UpstreamConfig) -> anyhow::Result<PgPool> {
    let pool = pool_options(config)
        .connect(&config.connection_string())
        .await?;
    Ok(pool)
}

/// Build a pool that connects on first use.
///
/// Connection failures then surface per query instead of up front.
pub fn connect_pool_lazy(config: &UpstreamConfig) -> anyhow::Result<PgPool> {
    Ok(pool_options(config).connect_lazy(&config.connection_string())?)
}

fn pool_options(config: &UpstreamConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .min_connections(config.pool.min_connections)
        .max_connections(config.pool.max_connections)
        .acquire_timeout(Duration::from_secs(config.pool.acquire_timeout_seconds))
}

/// A Postgres pool whose connections can carry a security context.
///
/// Every connection returned to the pool is checked for a leftover value of
/// the security variable and closed if one is found. The lifecycle guard
/// already clears before checkin; this catches anything that bypassed it.
#[derive(Clone)]
pub struct PgContextPool {
    pool: PgPool,
}

impl PgContextPool {
    pub async fn connect(config: &UpstreamConfig, variable: &str) -> anyhow::Result<Self> {
        Self::connect_with(pool_options(config), &config.connection_string(), variable).await
    }

    pub async fn connect_with(
        options: PgPoolOptions,
        url: &str,
        variable: &str,
    ) -> anyhow::Result<Self> {
        if !is_valid_variable_name(variable) {
            anyhow::bail!("invalid security variable name '{}'", variable);
        }
        let variable = variable.to_string();
        let pool = options
            .after_release(move |conn, _meta| {
                let variable = variable.clone();
                Box::pin(async move {
                    let clean = current_setting(conn, &variable).await?.is_none();
                    if !clean {
                        tracing::error!(
                            variable = %variable,
                            "Connection returned to pool with a bound security context, closing it"
                        );
                    }
                    Ok(clean)
                })
            })
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionSource for PgContextPool {
    type Connection = PgContextConnection;

    async fn acquire(&self) -> Result<PgContextConnection, ConnectionError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ConnectionError::Acquire(e.to_string()))?;
        Ok(PgContextConnection::new(conn))
    }
}

/// One pooled Postgres connection checked out for one request.
pub struct PgContextConnection {
    id: ConnectionId,
    conn: Option<PoolConnection<Postgres>>,
}

impl PgContextConnection {
    pub fn new(conn: PoolConnection<Postgres>) -> Self {
        Self {
            id: ConnectionId::new(),
            conn: Some(conn),
        }
    }

    /// The underlying connection, for domain queries.
    pub fn pg(&mut self) -> Result<&mut PgConnection, ConnectionError> {
        match self.conn.as_mut() {
            Some(conn) => Ok(&mut **conn),
            None => Err(ConnectionError::Closed),
        }
    }
}

#[async_trait]
impl ContextConnection for PgContextConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn execute(&mut self, statement: ContextStatement<'_>) -> Result<(), ConnectionError> {
        let kind = statement.kind();
        let conn = self.pg()?;

        let result = match statement {
            ContextStatement::Begin => conn.execute(sqlx::raw_sql("BEGIN")).await,
            ContextStatement::SetConfig {
                name,
                value,
                is_local,
            } => {
                sqlx::query("SELECT set_config($1, $2, $3)")
                    .bind(name)
                    .bind(value)
                    .bind(is_local)
                    .execute(&mut *conn)
                    .await
            }
            ContextStatement::Reset { name } => {
                // RESET takes an identifier, not a parameter.
                if !is_valid_variable_name(name) {
                    return Err(ConnectionError::Statement {
                        statement: kind,
                        message: format!("invalid variable name '{}'", name),
                    });
                }
                let sql = format!("RESET {}", name);
                conn.execute(sqlx::raw_sql(&sql)).await
            }
            ContextStatement::Commit => conn.execute(sqlx::raw_sql("COMMIT")).await,
            ContextStatement::Rollback => conn.execute(sqlx::raw_sql("ROLLBACK")).await,
        };

        result.map(|_| ()).map_err(|e| ConnectionError::Statement {
            statement: kind,
            message: e.to_string(),
        })
    }

    fn discard(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        // Detached connections never go back to the pool.
        let raw = conn.detach();
        tracing::debug!(connection_id = %self.id, "Discarding physical connection");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = raw.close().await {
                        tracing::debug!(error = %e, "Error closing discarded connection");
                    }
                });
            }
            Err(_) => drop(raw),
        }
    }
}

/// `current_setting(name, true)`, with an empty string treated as unset.
pub async fn current_setting(
    conn: &mut PgConnection,
    name: &str,
) -> Result<Option<String>, sqlx::Error> {
    let value: Option<String> = sqlx::query_scalar("SELECT current_setting($1, true)")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(value.filter(|v| !v.is_empty()))
}

/// Server process id of the physical connection.
pub async fn backend_pid(conn: &mut PgConnection) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT pg_backend_pid()")
        .fetch_one(&mut *conn)
        .await
}
