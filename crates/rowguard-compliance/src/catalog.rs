//! Read-only access to the database catalog.

use async_trait::async_trait;

use crate::classify::PolicyRecord;
use crate::error::IntrospectionError;

/// Reads table and policy metadata for one schema at a time.
///
/// Implementations must never touch the per-connection security variable.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn schema_exists(&self, schema: &str) -> Result<bool, IntrospectionError>;

    /// Every ordinary and partitioned table in `schema`, ordered by name.
    async fn policy_records(&self, schema: &str) -> Result<Vec<PolicyRecord>, IntrospectionError>;
}

/// A fixed catalog held in memory.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    records: Vec<PolicyRecord>,
    schemas: Vec<String>,
    failing: Vec<(String, IntrospectionError)>,
}

#[cfg(any(test, feature = "test-util"))]
impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty schema.
    pub fn with_schema(mut self, schema: &str) -> Self {
        if !self.schemas.iter().any(|s| s == schema) {
            self.schemas.push(schema.to_string());
        }
        self
    }

    pub fn with_table(mut self, schema: &str, table: &str, enabled: bool, policies: &[&str]) -> Self {
        self = self.with_schema(schema);
        let mut policies: Vec<String> = policies.iter().map(|p| p.to_string()).collect();
        policies.sort();
        self.records.push(PolicyRecord {
            schema: schema.to_string(),
            table: table.to_string(),
            row_filtering_enabled: enabled,
            force_row_filtering: false,
            policies,
        });
        self
    }

    /// Make every read of `schema` fail with `error`.
    pub fn with_failure(mut self, schema: &str, error: IntrospectionError) -> Self {
        self = self.with_schema(schema);
        self.failing.push((schema.to_string(), error));
        self
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn schema_exists(&self, schema: &str) -> Result<bool, IntrospectionError> {
        Ok(self.schemas.iter().any(|s| s == schema))
    }

    async fn policy_records(&self, schema: &str) -> Result<Vec<PolicyRecord>, IntrospectionError> {
        if let Some((_, err)) = self.failing.iter().find(|(s, _)| s == schema) {
            return Err(err.clone());
        }
        let mut records: Vec<PolicyRecord> = self
            .records
            .iter()
            .filter(|r| r.schema == schema)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.table.cmp(&b.table));
        Ok(records)
    }
}
