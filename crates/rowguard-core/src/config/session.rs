//! Security-context binding configuration.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// How long a bound principal id lives on the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BindScope {
    /// `set_config(name, value, true)` inside an explicit transaction.
    /// The engine resets the value at COMMIT or ROLLBACK.
    #[default]
    Transaction,
    /// `set_config(name, value, false)` on a connection pinned to the request.
    /// Must be RESET before the connection goes back to the pool.
    Session,
}

impl BindScope {
    pub fn is_local(&self) -> bool {
        matches!(self, BindScope::Transaction)
    }
}

impl std::fmt::Display for BindScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindScope::Transaction => write!(f, "transaction"),
            BindScope::Session => write!(f, "session"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the connection-scoped variable read by RLS policies.
    #[serde(default = "default_variable")]
    pub variable: String,

    #[serde(default)]
    pub scope: BindScope,

    /// Upper bound for one request's work on a bound connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            variable: default_variable(),
            scope: BindScope::default(),
            request_timeout_ms: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_variable_name(&self.variable) {
            return Err(ConfigError::Config(format!(
                "session.variable '{}' must look like 'namespace.name' using [a-z0-9_]",
                self.variable
            )));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Config(
                "session.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Custom Postgres settings are two-part names. The variable name is the only
/// piece of text that is ever spliced into SQL (`RESET <name>`), so the
/// accepted alphabet is deliberately tiny.
pub fn is_valid_variable_name(name: &str) -> bool {
    let mut parts = name.split('.');
    let (Some(namespace), Some(key), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    is_identifier(namespace) && is_identifier(key)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    s.len() <= 63 && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn default_variable() -> String {
    crate::DEFAULT_SECURITY_VARIABLE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_names() {
        assert!(is_valid_variable_name("app.current_user_id"));
        assert!(is_valid_variable_name("rls.tenant_2"));
        assert!(!is_valid_variable_name("current_user_id"));
        assert!(!is_valid_variable_name("app.current.user"));
        assert!(!is_valid_variable_name("App.user"));
        assert!(!is_valid_variable_name("app.1user"));
        assert!(!is_valid_variable_name("app.user id"));
        assert!(!is_valid_variable_name(""));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = SessionConfig {
            request_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scope_is_local() {
        assert!(BindScope::Transaction.is_local());
        assert!(!BindScope::Session.is_local());
    }
}
