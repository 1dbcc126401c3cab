use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Configuration types shared across all Rowguard crates
pub mod config;

pub use config::{
    AuthConfig, BindScope, ComplianceConfig, ConfigError, LoggingConfig, RowguardConfig,
    ServerConfig, SessionConfig, UpstreamConfig,
};

/// Connection-scoped variable read by every row-filtering policy.
///
/// Changing this name requires updating all policy definitions in lockstep.
pub const DEFAULT_SECURITY_VARIABLE: &str = "app.current_user_id";

/// The authenticated identity associated with one request.
///
/// Created by decoding a bearer credential; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::Member => "member",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
