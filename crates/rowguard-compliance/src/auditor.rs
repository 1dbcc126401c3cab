//! One audit run over a list of schemas.

use chrono::Utc;
use rowguard_core::ComplianceConfig;

use crate::catalog::CatalogSource;
use crate::classify::{ClassificationThresholds, ComplianceStatus};
use crate::error::IntrospectionError;
use crate::report::{ComplianceReport, SchemaReport, TableResult};

/// Introspects, classifies and aggregates. Constructed per invocation and
/// holds no state between runs, so concurrent audits are independent.
pub struct ComplianceAuditor<'a, S: CatalogSource + ?Sized> {
    source: &'a S,
    schemas: Vec<String>,
    thresholds: ClassificationThresholds,
}

impl<'a, S: CatalogSource + ?Sized> ComplianceAuditor<'a, S> {
    pub fn new(source: &'a S, schemas: Vec<String>, thresholds: ClassificationThresholds) -> Self {
        Self {
            source,
            schemas,
            thresholds,
        }
    }

    pub fn from_config(source: &'a S, config: &ComplianceConfig) -> Self {
        Self::new(source, config.schemas.clone(), config.into())
    }

    /// Audit every configured schema in order.
    ///
    /// Never fails: a schema that cannot be read is recorded as errored and
    /// the remaining schemas are still audited.
    pub async fn run(&self) -> ComplianceReport {
        let mut reports = Vec::with_capacity(self.schemas.len());
        for schema in &self.schemas {
            let report = match self.audit_schema(schema).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(schema = %schema, error = %e, "Schema introspection failed");
                    SchemaReport::errored(schema.clone(), e)
                }
            };
            reports.push(report);
        }

        let report = ComplianceReport::new(Utc::now(), reports);
        tracing::info!(
            tables = report.totals.total_tables,
            protected = report.totals.protected,
            partial = report.totals.partial,
            unprotected = report.totals.unprotected,
            compliance = report.totals.compliance_percentage(),
            overall = %report.overall_status,
            "Compliance audit complete"
        );
        report
    }

    async fn audit_schema(&self, schema: &str) -> Result<SchemaReport, IntrospectionError> {
        if !self.source.schema_exists(schema).await? {
            return Err(IntrospectionError::SchemaNotFound(schema.to_string()));
        }

        let records = self.source.policy_records(schema).await?;
        let results: Vec<TableResult> = records
            .into_iter()
            .map(|record| {
                let status = self.thresholds.classify_record(&record);
                if status != ComplianceStatus::Protected {
                    tracing::warn!(
                        schema = %schema,
                        table = %record.table,
                        rls_enabled = record.row_filtering_enabled,
                        policies = record.policies.len(),
                        status = %status,
                        "Table is not fully protected"
                    );
                }
                TableResult::new(record, status)
            })
            .collect();

        tracing::debug!(schema = %schema, tables = results.len(), "Schema audited");
        Ok(SchemaReport::from_results(schema, results))
    }
}

/// Emit loud warnings for findings. Findings never stop the caller.
pub fn log_findings(report: &ComplianceReport) {
    if report.nothing_audited() {
        tracing::error!(
            schemas = report.schemas.len(),
            "No schema could be introspected; compliance status covers no tables"
        );
    }
    if report.totals.has_findings() {
        tracing::warn!(
            unprotected = report.totals.unprotected,
            partial = report.totals.partial,
            overall = %report.overall_status,
            "Row-level security coverage is incomplete"
        );
        for line in &report.recommendations {
            tracing::warn!(recommendation = %line, "Compliance recommendation");
        }
    }
    for schema in report.errored_schemas() {
        tracing::warn!(schema = %schema.schema, "Schema missing from compliance report");
    }
}
