//! Bearer credential commands.
//!
//! - `rowguard token verify` checks signature, expiry and claims
//! - `rowguard token inspect` decodes claims without verification

use anyhow::Context;
use chrono::{TimeZone, Utc};
use rowguard_core::{Principal, RowguardConfig};
use rowguard_token::{DecoderOptions, PrincipalDecoder, SigningSecret, TokenClaims};
use std::path::Path;

/// Accept either a literal token or a path to a file holding one.
fn resolve_token(token: &str) -> anyhow::Result<String> {
    let path = Path::new(token);
    if path.is_file() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read token file: {}", token))?;
        return Ok(content.trim().to_string());
    }
    Ok(token.trim().to_string())
}

fn decoder(config: &RowguardConfig) -> anyhow::Result<PrincipalDecoder> {
    let secret = SigningSecret::from_config(&config.auth)
        .context("Failed to load signing secret")?;
    Ok(PrincipalDecoder::new(
        &secret,
        DecoderOptions::from(&config.auth),
    ))
}

pub(crate) fn verify_token(config: &RowguardConfig, token: &str) -> anyhow::Result<Principal> {
    let token = resolve_token(token)?;
    let principal = decoder(config)?
        .decode(&token)
        .context("Token verification failed")?;
    Ok(principal)
}

/// Verify a credential and print the principal it carries.
pub fn verify(config: &RowguardConfig, token: &str) -> anyhow::Result<()> {
    let principal = verify_token(config, token)?;

    println!("✔ Token is valid");
    println!();
    println!("Principal:");
    println!("  ID:      {}", principal.id);
    println!("  Email:   {}", principal.email);
    println!("  Role:    {}", principal.role);
    println!("  Issued:  {}", principal.issued_at.to_rfc3339());
    println!("  Expires: {}", principal.expires_at.to_rfc3339());

    Ok(())
}

pub(crate) fn inspect_token(token: &str) -> anyhow::Result<TokenClaims> {
    let token = resolve_token(token)?;
    let claims = rowguard_token::inspect_unverified(&token).context("Failed to decode token")?;
    Ok(claims)
}

/// Print a credential's claims. The signature is NOT checked.
pub fn inspect(token: &str) -> anyhow::Result<()> {
    let claims = inspect_token(token)?;

    println!("⚠️  Signature not verified");
    println!();
    println!("{}", serde_json::to_string_pretty(&claims)?);

    if let Some(exp) = Utc.timestamp_opt(claims.exp, 0).single() {
        let status = if exp <= Utc::now() { "expired" } else { "not expired" };
        println!();
        println!("Expires: {} ({})", exp.to_rfc3339(), status);
    }

    Ok(())
}
