use async_trait::async_trait;
use rowguard_compliance::{CatalogSource, IntrospectionError, PolicyRecord};
use sqlx::{PgPool, Row};

/// SQLSTATE for insufficient_privilege.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Reads RLS flags and policy names from the Postgres system catalogs.
///
/// Read-only and lock-free; safe to run alongside live traffic.
#[derive(Clone)]
pub struct PgCatalogIntrospector {
    pool: PgPool,
}

impl PgCatalogIntrospector {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_error(schema: &str, e: sqlx::Error) -> IntrospectionError {
    if let sqlx::Error::Database(db) = &e
        && db.code().as_deref() == Some(INSUFFICIENT_PRIVILEGE)
    {
        return IntrospectionError::PermissionDenied(schema.to_string());
    }
    IntrospectionError::Query {
        schema: schema.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl CatalogSource for PgCatalogIntrospector {
    async fn schema_exists(&self, schema: &str) -> Result<bool, IntrospectionError> {
        let (exists,): (bool,) =
            sqlx::query_as("select exists(select 1 from pg_namespace where nspname = $1)")
                .bind(schema)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| query_error(schema, e))?;
        Ok(exists)
    }

    async fn policy_records(&self, schema: &str) -> Result<Vec<PolicyRecord>, IntrospectionError> {
        let (usage,): (bool,) = sqlx::query_as("select has_schema_privilege($1, 'USAGE')")
            .bind(schema)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error(schema, e))?;
        if !usage {
            return Err(IntrospectionError::PermissionDenied(schema.to_string()));
        }

        // Ordinary and partitioned tables, policies aggregated by name.
        let rows = sqlx::query(
            r#"
            select
              c.relname::text as table_name,
              c.relrowsecurity as rls_enabled,
              c.relforcerowsecurity as rls_forced,
              coalesce(
                array_agg(p.policyname::text order by p.policyname)
                  filter (where p.policyname is not null),
                '{}'::text[]
              ) as policies
            from pg_class c
            join pg_namespace n on n.oid = c.relnamespace
            left join pg_policies p
              on p.schemaname = n.nspname
             and p.tablename = c.relname
            where n.nspname = $1
              and c.relkind in ('r', 'p')
            group by c.relname, c.relrowsecurity, c.relforcerowsecurity
            order by c.relname
            "#,
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error(schema, e))?;

        let records = rows
            .into_iter()
            .map(|row| PolicyRecord {
                schema: schema.to_string(),
                table: row.get("table_name"),
                row_filtering_enabled: row.get("rls_enabled"),
                force_row_filtering: row.get("rls_forced"),
                policies: row.get("policies"),
            })
            .collect::<Vec<_>>();

        tracing::debug!(schema = %schema, tables = records.len(), "Catalog introspected");
        Ok(records)
    }
}
