//! Bearer credential verification.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use rowguard_core::{AuthConfig, Principal};

use crate::claims::TokenClaims;
use crate::error::AuthenticationError;
use crate::secret::SigningSecret;

const BEARER_SCHEME: &str = "bearer";

/// Validation knobs beyond the secret itself.
#[derive(Debug, Clone, Default)]
pub struct DecoderOptions {
    /// Required `iss` claim, if any.
    pub issuer: Option<String>,
    /// Clock skew tolerated when checking `exp`.
    pub leeway_seconds: u64,
}

impl From<&AuthConfig> for DecoderOptions {
    fn from(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            leeway_seconds: config.leeway_seconds,
        }
    }
}

/// Verifies HS256 credentials against the shared secret and extracts the principal.
#[derive(Clone)]
pub struct PrincipalDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl PrincipalDecoder {
    pub fn new(secret: &SigningSecret, options: DecoderOptions) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = options.leeway_seconds;
        match &options.issuer {
            // `iss` is only checked when present unless it is also required.
            Some(issuer) => {
                validation.set_required_spec_claims(&["exp", "iss"]);
                validation.set_issuer(&[issuer]);
            }
            None => validation.set_required_spec_claims(&["exp"]),
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a raw token (no `Bearer ` prefix) and extract the principal.
    pub fn decode(&self, token: &str) -> Result<Principal, AuthenticationError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthenticationError::MissingCredential);
        }

        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthenticationError::ExpiredCredential,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthenticationError::InvalidSignature
                }
                ErrorKind::InvalidIssuer => {
                    AuthenticationError::MalformedCredential("untrusted issuer".to_string())
                }
                ErrorKind::MissingRequiredClaim(claim) => AuthenticationError::MalformedCredential(
                    format!("missing required claim: {}", claim),
                ),
                _ => AuthenticationError::MalformedCredential(e.to_string()),
            }
        })?;

        let principal = data.claims.into_principal()?;
        tracing::debug!(
            principal = %principal.id,
            role = %principal.role,
            "Credential verified"
        );
        Ok(principal)
    }

    /// Parse an `Authorization` header value and decode the bearer token.
    pub fn decode_authorization(
        &self,
        header: Option<&str>,
    ) -> Result<Principal, AuthenticationError> {
        let token = bearer_token(header)?;
        self.decode(token)
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthenticationError> {
    let value = header.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(AuthenticationError::MissingCredential);
    }

    // A bare scheme with nothing after it means no credential was sent.
    let (scheme, rest) = value.split_once(char::is_whitespace).unwrap_or((value, ""));
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(AuthenticationError::MalformedCredential(format!(
            "unsupported authorization scheme '{}'",
            scheme
        )));
    }

    let token = rest.trim();
    if token.is_empty() {
        return Err(AuthenticationError::MissingCredential);
    }
    Ok(token)
}

/// Read claims without checking the signature or expiry.
///
/// For operator debugging only; never use the result for authorization.
pub fn inspect_unverified(token: &str) -> Result<TokenClaims, AuthenticationError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token.trim(), &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthenticationError::MalformedCredential(e.to_string()))
}
