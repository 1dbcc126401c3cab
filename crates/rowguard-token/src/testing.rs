//! Token fixtures for tests. Not compiled into release builds.

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};

use crate::claims::TokenClaims;
use crate::secret::SigningSecret;

pub const TEST_SECRET: &str = "rowguard-test-secret-0123456789-abcdefghij";

pub fn test_secret() -> SigningSecret {
    SigningSecret::new(TEST_SECRET).expect("test secret is long enough")
}

/// Member claims for `id` expiring `ttl_secs` from now (negative for expired).
pub fn test_claims(id: &str, ttl_secs: i64) -> TokenClaims {
    let now = Utc::now().timestamp();
    TokenClaims {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        role: "member".to_string(),
        iat: now - 60,
        exp: now + ttl_secs,
        iss: None,
    }
}

pub fn sign(claims: &TokenClaims, secret: &SigningSecret) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("test claims always encode")
}
