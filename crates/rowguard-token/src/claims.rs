//! Claims carried by a bearer credential.

use chrono::{DateTime, Utc};
use rowguard_core::{Principal, Role};
use serde::{Deserialize, Serialize};

use crate::error::AuthenticationError;

/// Raw JWT claims as issued by the platform's auth service.
///
/// `role` stays a string here so an unknown role is reported as a malformed
/// credential rather than a JSON error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub id: String,
    pub email: String,
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl TokenClaims {
    /// Convert verified claims into a principal.
    pub fn into_principal(self) -> Result<Principal, AuthenticationError> {
        if self.id.trim().is_empty() {
            return Err(AuthenticationError::MalformedCredential(
                "missing required claim: id".to_string(),
            ));
        }

        let role = parse_role(&self.role)?;
        let issued_at = timestamp(self.iat, "iat")?;
        let expires_at = timestamp(self.exp, "exp")?;

        Ok(Principal {
            id: self.id,
            role,
            email: self.email,
            issued_at,
            expires_at,
        })
    }
}

fn parse_role(role: &str) -> Result<Role, AuthenticationError> {
    match role {
        "admin" => Ok(Role::Admin),
        "manager" => Ok(Role::Manager),
        "staff" => Ok(Role::Staff),
        "member" => Ok(Role::Member),
        other => Err(AuthenticationError::MalformedCredential(format!(
            "unknown role '{}'",
            other
        ))),
    }
}

fn timestamp(secs: i64, claim: &str) -> Result<DateTime<Utc>, AuthenticationError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        AuthenticationError::MalformedCredential(format!("claim '{}' is out of range", claim))
    })
}
