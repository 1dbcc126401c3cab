//! # rowguard-compliance
//!
//! Audits row-level security coverage for a configured list of schemas.
//!
//! The pipeline is catalog introspection, then per-table classification,
//! then aggregation into a report:
//!
//! | Status | Condition |
//! |--------|-----------|
//! | `PROTECTED` | RLS enabled, at least 2 policies |
//! | `PARTIAL` | RLS enabled, exactly 1 policy |
//! | `UNPROTECTED` | RLS disabled, or enabled with no policies |
//!
//! Overall status is `EXCELLENT` with no unprotected and at most 2 partial
//! tables, `GOOD` with at most 2 unprotected tables, `CRITICAL` otherwise.
//!
//! Findings are never errors. Callers print or log the report and carry on.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let auditor = ComplianceAuditor::from_config(&introspector, &config.compliance);
//! let report = auditor.run().await;
//! println!("{}", render(&report));
//! report.write_artifact(&config.compliance.report_path)?;
//! ```

pub mod auditor;
pub mod catalog;
pub mod classify;
pub mod error;
pub mod render;
pub mod report;

pub use auditor::{ComplianceAuditor, log_findings};
#[cfg(any(test, feature = "test-util"))]
pub use catalog::StaticCatalog;
pub use catalog::CatalogSource;
pub use classify::{ClassificationThresholds, ComplianceStatus, PolicyRecord, classify};
pub use error::{ComplianceError, IntrospectionError};
pub use render::render;
pub use report::{
    ComplianceReport, ComplianceSummary, OverallStatus, SchemaReport, TableResult,
    recommendations,
};
