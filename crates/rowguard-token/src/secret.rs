//! Shared signing secret management.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rowguard_core::AuthConfig;

use crate::error::SecretError;

/// HS256 keys shorter than the hash output weaken the MAC.
pub const MIN_SECRET_BYTES: usize = 32;

/// Random bytes drawn by [`SigningSecret::generate_encoded`].
const GENERATED_SECRET_BYTES: usize = 48;

/// The secret shared with the platform's credential issuer.
#[derive(Clone)]
pub struct SigningSecret {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SigningSecret {
    /// Wrap a secret string, rejecting anything too short to be safe.
    pub fn new(secret: impl Into<String>) -> Result<Self, SecretError> {
        let bytes = secret.into().into_bytes();
        if bytes.len() < MIN_SECRET_BYTES {
            return Err(SecretError::TooShort {
                len: bytes.len(),
                min: MIN_SECRET_BYTES,
            });
        }
        Ok(Self { bytes })
    }

    /// Resolve the secret from configuration (env var, file, then inline).
    pub fn from_config(config: &AuthConfig) -> Result<Self, SecretError> {
        let secret = config.resolve_secret()?.ok_or(SecretError::Missing)?;
        Self::new(secret)
    }

    /// Generate a fresh base64 secret suitable for both issuer and verifier.
    pub fn generate_encoded() -> String {
        let mut bytes = [0u8; GENERATED_SECRET_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
