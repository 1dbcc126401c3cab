//! Error types for credential decoding.

use thiserror::Error;

/// Why a bearer credential was rejected.
///
/// Every variant maps to the same 401 response at the HTTP boundary; the
/// detail is for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    /// No `Authorization` header, or an empty bearer value.
    #[error("missing bearer credential")]
    MissingCredential,

    /// Not a bearer header, not a JWT, or claims that do not form a principal.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// Signature verified but `exp` is in the past.
    #[error("credential expired")]
    ExpiredCredential,

    /// Signature does not match the shared secret (or wrong algorithm).
    #[error("credential signature is invalid")]
    InvalidSignature,
}

/// Errors resolving the shared signing secret.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("no signing secret configured (set the secret env var, secret_file or secret)")]
    Missing,

    #[error("signing secret is too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
