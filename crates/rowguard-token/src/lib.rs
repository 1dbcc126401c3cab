//! # rowguard-token
//!
//! Turns a bearer credential into a [`Principal`](rowguard_core::Principal).
//!
//! This crate provides functionality for:
//! - Resolving and generating the shared signing secret
//! - Parsing `Authorization: Bearer <token>` headers
//! - Verifying HS256 signatures and expiry
//! - Extracting `{ id, email, role, iat, exp }` claims
//!
//! Decoding has no side effects and runs before any database connection is
//! touched for the request. Issuing credentials is not this crate's job; the
//! `test-util` feature exposes a signer for tests only.

pub mod claims;
pub mod decoder;
pub mod error;
pub mod secret;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use claims::TokenClaims;
pub use decoder::{DecoderOptions, PrincipalDecoder, inspect_unverified};
pub use error::{AuthenticationError, SecretError};
pub use secret::SigningSecret;
