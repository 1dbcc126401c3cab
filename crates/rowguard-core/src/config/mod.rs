//! Configuration types for Rowguard.
//!
//! A single YAML file (`rowguard.yaml` by default) configures every component:
//!
//! - **upstream**: the Postgres connection and pool sizing
//! - **auth**: where the shared signing secret comes from and how tokens are validated
//! - **session**: the security variable name and binding scope
//! - **compliance**: which schemas are audited and the classification thresholds
//! - **server** / **logging**: host process settings
//!
//! Every section has serde defaults, so an empty file is a valid configuration.

pub mod auth;
pub mod compliance;
pub mod session;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use auth::AuthConfig;
pub use compliance::ComplianceConfig;
pub use session::{BindScope, SessionConfig};
pub use upstream::{ConnectionPoolConfig, UpstreamConfig};

/// Complete Rowguard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowguardConfig {
    /// Upstream Postgres connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Credential verification settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Security-context binding settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// RLS compliance audit settings.
    #[serde(default)]
    pub compliance: ComplianceConfig,

    /// HTTP host settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Log filter settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:8080"
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` env-filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RowguardConfig {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.compliance.validate()?;
        Ok(())
    }
}
