//! Bearer credential verification configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the shared signing secret comes from, and how strictly tokens are checked.
///
/// Secret precedence: `secret_env`, then `secret_file`, then inline `secret`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable containing the signing secret.
    #[serde(default = "default_secret_env")]
    pub secret_env: Option<String>,

    /// Path to a file containing the signing secret.
    #[serde(default)]
    pub secret_file: Option<PathBuf>,

    /// Inline secret. Intended for local development only.
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,

    /// Required `iss` claim, if any.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Clock skew tolerated when checking `exp`.
    #[serde(default)]
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
            secret_file: None,
            secret: None,
            issuer: None,
            leeway_seconds: 0,
        }
    }
}

impl AuthConfig {
    /// Resolve the raw secret from environment, file or inline value.
    pub fn resolve_secret(&self) -> Result<Option<String>, std::io::Error> {
        if let Some(env_var) = &self.secret_env
            && let Ok(secret) = std::env::var(env_var)
            && !secret.trim().is_empty()
        {
            return Ok(Some(secret.trim().to_string()));
        }

        if let Some(path) = &self.secret_file {
            let secret = std::fs::read_to_string(path)?;
            return Ok(Some(secret.trim().to_string()));
        }

        Ok(self.secret.clone())
    }
}

fn default_secret_env() -> Option<String> {
    Some("ROWGUARD_JWT_SECRET".to_string())
}
