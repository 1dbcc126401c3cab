//! RLS compliance audit configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ConfigError;

/// Minimum attached policies for a table with RLS enabled to count as protected.
pub const PROTECTED_MIN_POLICIES: usize = 2;

/// Minimum attached policies for a table with RLS enabled to count as partial.
pub const PARTIAL_MIN_POLICIES: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Ordered list of schemas to audit.
    #[serde(default = "default_schemas")]
    pub schemas: Vec<String>,

    #[serde(default = "default_protected_min")]
    pub protected_min_policies: usize,

    #[serde(default = "default_partial_min")]
    pub partial_min_policies: usize,

    /// Where the JSON artifact is written.
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,

    /// Run the audit when the HTTP host starts. Findings never block startup.
    #[serde(default = "default_true")]
    pub check_on_startup: bool,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            schemas: default_schemas(),
            protected_min_policies: default_protected_min(),
            partial_min_policies: default_partial_min(),
            report_path: default_report_path(),
            check_on_startup: true,
        }
    }
}

impl ComplianceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schemas.is_empty() {
            return Err(ConfigError::Config(
                "compliance.schemas must name at least one schema".to_string(),
            ));
        }
        if let Some(blank) = self.schemas.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::Config(format!(
                "compliance.schemas contains a blank entry: '{}'",
                blank
            )));
        }
        if self.partial_min_policies == 0 {
            return Err(ConfigError::Config(
                "compliance.partial_min_policies must be at least 1".to_string(),
            ));
        }
        if self.protected_min_policies <= self.partial_min_policies {
            return Err(ConfigError::Config(format!(
                "compliance.protected_min_policies ({}) must exceed partial_min_policies ({})",
                self.protected_min_policies, self.partial_min_policies
            )));
        }
        Ok(())
    }
}

fn default_schemas() -> Vec<String> {
    vec!["public".to_string()]
}

fn default_protected_min() -> usize {
    PROTECTED_MIN_POLICIES
}

fn default_partial_min() -> usize {
    PARTIAL_MIN_POLICIES
}

fn default_report_path() -> PathBuf {
    PathBuf::from("reports/rls-compliance.json")
}

fn default_true() -> bool {
    true
}
