//! Aggregated compliance results and the JSON artifact they serialize to.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use crate::classify::{ComplianceStatus, PolicyRecord};
use crate::error::{ComplianceError, IntrospectionError};

/// Overall is EXCELLENT only with no unprotected tables and at most this many partial ones.
pub const EXCELLENT_MAX_PARTIAL: usize = 2;

/// Overall is at least GOOD with at most this many unprotected tables.
pub const GOOD_MAX_UNPROTECTED: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Excellent,
    Good,
    Critical,
}

impl OverallStatus {
    pub fn from_summary(summary: &ComplianceSummary) -> Self {
        if summary.unprotected == 0 && summary.partial <= EXCELLENT_MAX_PARTIAL {
            OverallStatus::Excellent
        } else if summary.unprotected <= GOOD_MAX_UNPROTECTED {
            OverallStatus::Good
        } else {
            OverallStatus::Critical
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Excellent => write!(f, "EXCELLENT"),
            OverallStatus::Good => write!(f, "GOOD"),
            OverallStatus::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Table counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComplianceSummary {
    pub total_tables: usize,
    pub protected: usize,
    pub partial: usize,
    pub unprotected: usize,
}

impl ComplianceSummary {
    pub fn record(&mut self, status: ComplianceStatus) {
        self.total_tables += 1;
        match status {
            ComplianceStatus::Protected => self.protected += 1,
            ComplianceStatus::Partial => self.partial += 1,
            ComplianceStatus::Unprotected => self.unprotected += 1,
        }
    }

    pub fn merge(&mut self, other: &ComplianceSummary) {
        self.total_tables += other.total_tables;
        self.protected += other.protected;
        self.partial += other.partial;
        self.unprotected += other.unprotected;
    }

    /// `round(protected / total * 100)`, or 0 for an empty summary.
    pub fn compliance_percentage(&self) -> u32 {
        if self.total_tables == 0 {
            return 0;
        }
        (self.protected as f64 / self.total_tables as f64 * 100.0).round() as u32
    }

    pub fn has_findings(&self) -> bool {
        self.unprotected > 0 || self.partial > 0
    }
}

impl Serialize for ComplianceSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ComplianceSummary", 5)?;
        s.serialize_field("totalTables", &self.total_tables)?;
        s.serialize_field("protected", &self.protected)?;
        s.serialize_field("partial", &self.partial)?;
        s.serialize_field("unprotected", &self.unprotected)?;
        s.serialize_field("compliancePercentage", &self.compliance_percentage())?;
        s.end()
    }
}

/// One classified table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResult {
    pub table: String,
    #[serde(rename = "rlsEnabled")]
    pub row_filtering_enabled: bool,
    #[serde(rename = "rlsForced")]
    pub force_row_filtering: bool,
    pub policy_count: usize,
    pub policies: Vec<String>,
    pub status: ComplianceStatus,
}

impl TableResult {
    pub fn new(record: PolicyRecord, status: ComplianceStatus) -> Self {
        Self {
            policy_count: record.policies.len(),
            table: record.table,
            row_filtering_enabled: record.row_filtering_enabled,
            force_row_filtering: record.force_row_filtering,
            policies: record.policies,
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    #[serde(skip)]
    pub schema: String,
    pub results: Vec<TableResult>,
    pub summary: ComplianceSummary,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_error")]
    pub error: Option<IntrospectionError>,
}

impl SchemaReport {
    pub fn from_results(schema: impl Into<String>, results: Vec<TableResult>) -> Self {
        let mut summary = ComplianceSummary::default();
        for result in &results {
            summary.record(result.status);
        }
        Self {
            schema: schema.into(),
            results,
            summary,
            error: None,
        }
    }

    /// A schema whose catalog could not be read. Contributes no tables.
    pub fn errored(schema: impl Into<String>, error: IntrospectionError) -> Self {
        Self {
            schema: schema.into(),
            results: Vec::new(),
            summary: ComplianceSummary::default(),
            error: Some(error),
        }
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<IntrospectionError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Result of one audit run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    #[serde(rename = "timestamp")]
    pub generated_at: DateTime<Utc>,
    pub overall_status: OverallStatus,
    /// False when any schema could not be introspected.
    pub audit_complete: bool,
    #[serde(rename = "summary")]
    pub totals: ComplianceSummary,
    /// In configured schema order.
    #[serde(serialize_with = "serialize_schemas")]
    pub schemas: Vec<SchemaReport>,
    pub recommendations: Vec<String>,
}

fn serialize_schemas<S: Serializer>(
    schemas: &[SchemaReport],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(schemas.len()))?;
    for schema in schemas {
        map.serialize_entry(&schema.schema, schema)?;
    }
    map.end()
}

impl ComplianceReport {
    pub fn new(generated_at: DateTime<Utc>, schemas: Vec<SchemaReport>) -> Self {
        let mut totals = ComplianceSummary::default();
        for schema in &schemas {
            totals.merge(&schema.summary);
        }
        let errored = schemas.iter().filter(|s| s.error.is_some()).count();

        Self {
            generated_at,
            overall_status: OverallStatus::from_summary(&totals),
            audit_complete: errored == 0,
            recommendations: recommendations(&totals, errored),
            totals,
            schemas,
        }
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaReport> {
        self.schemas.iter().find(|s| s.schema == name)
    }

    /// Every configured schema failed, so the status describes no tables.
    pub fn nothing_audited(&self) -> bool {
        !self.schemas.is_empty() && self.schemas.iter().all(|s| s.error.is_some())
    }

    pub fn errored_schemas(&self) -> impl Iterator<Item = &SchemaReport> {
        self.schemas.iter().filter(|s| s.error.is_some())
    }

    pub fn to_json(&self) -> Result<String, ComplianceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON artifact, creating parent directories as needed.
    pub fn write_artifact(&self, path: &Path) -> Result<(), ComplianceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "Compliance report written");
        Ok(())
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Ordered recommendation lines for the given totals.
pub fn recommendations(totals: &ComplianceSummary, errored_schemas: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if totals.unprotected > 0 {
        lines.push(format!(
            "Enable row-level security and add policies on {}",
            plural(totals.unprotected, "unprotected table", "unprotected tables")
        ));
    }
    if totals.partial > 0 {
        lines.push(format!(
            "Add a second policy to {} so writes are guarded as well as reads",
            plural(totals.partial, "partially protected table", "partially protected tables")
        ));
    }
    if errored_schemas > 0 {
        lines.push(format!(
            "Investigate {} that could not be introspected",
            plural(errored_schemas, "schema", "schemas")
        ));
    }
    if totals.has_findings() {
        lines.push("Run the RLS integration tests to confirm tenant isolation".to_string());
        lines.push("Document the row-level security policies for every tenant table".to_string());
    }
    lines
}
