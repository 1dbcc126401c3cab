//! Error types for the compliance crate.

use thiserror::Error;

/// A catalog read failed for one schema.
///
/// Never fatal to an audit run: the auditor records it on the schema and
/// moves on to the next one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntrospectionError {
    #[error("schema '{0}' does not exist")]
    SchemaNotFound(String),

    #[error("permission denied on schema '{0}'")]
    PermissionDenied(String),

    #[error("catalog query failed for schema '{schema}': {message}")]
    Query { schema: String, message: String },
}

/// Errors writing the report artifact.
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
