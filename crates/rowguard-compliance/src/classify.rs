//! Per-table compliance classification.

use rowguard_core::ComplianceConfig;
use rowguard_core::config::compliance::{PARTIAL_MIN_POLICIES, PROTECTED_MIN_POLICIES};
use serde::{Deserialize, Serialize};

/// One table's row-level security configuration, as read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub schema: String,
    pub table: String,
    pub row_filtering_enabled: bool,
    /// RLS also applies to the table owner.
    #[serde(default)]
    pub force_row_filtering: bool,
    /// Policy names, ordered by name.
    pub policies: Vec<String>,
}

impl PolicyRecord {
    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Protected,
    Partial,
    Unprotected,
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceStatus::Protected => write!(f, "PROTECTED"),
            ComplianceStatus::Partial => write!(f, "PARTIAL"),
            ComplianceStatus::Unprotected => write!(f, "UNPROTECTED"),
        }
    }
}

/// Policy-count thresholds separating the three statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationThresholds {
    pub protected_min_policies: usize,
    pub partial_min_policies: usize,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            protected_min_policies: PROTECTED_MIN_POLICIES,
            partial_min_policies: PARTIAL_MIN_POLICIES,
        }
    }
}

impl From<&ComplianceConfig> for ClassificationThresholds {
    fn from(config: &ComplianceConfig) -> Self {
        Self {
            protected_min_policies: config.protected_min_policies,
            partial_min_policies: config.partial_min_policies,
        }
    }
}

impl ClassificationThresholds {
    pub fn classify(&self, row_filtering_enabled: bool, policy_count: usize) -> ComplianceStatus {
        if !row_filtering_enabled {
            return ComplianceStatus::Unprotected;
        }
        if policy_count >= self.protected_min_policies {
            ComplianceStatus::Protected
        } else if policy_count >= self.partial_min_policies {
            ComplianceStatus::Partial
        } else {
            // Flag on with nothing enforcing it.
            ComplianceStatus::Unprotected
        }
    }

    pub fn classify_record(&self, record: &PolicyRecord) -> ComplianceStatus {
        self.classify(record.row_filtering_enabled, record.policy_count())
    }
}

/// Classify with the default thresholds.
pub fn classify(row_filtering_enabled: bool, policy_count: usize) -> ComplianceStatus {
    ClassificationThresholds::default().classify(row_filtering_enabled, policy_count)
}
