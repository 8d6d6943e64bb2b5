//! Public payload decoding for bearer tokens.
//!
//! The gateway never verifies token signatures; that belongs to the RPC
//! service. It only reads the public payload to learn which tenant the
//! caller is, so that key material can be scoped to that tenant.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::keyspace::TenantPrefix;

/// Header prefix stripped from the `Authorization` value before parsing.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Leading marker of a PASETO v2 public token.
pub const PASETO_V2_PUBLIC: &str = "v2.public.";

/// Length of the Ed25519 signature trailing a PASETO v2 public payload.
const PASETO_SIGNATURE_LEN: usize = 64;

/// Errors from reading the public payload of a token.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("auth token is empty")]
    Empty,
    #[error("unrecognized auth token format")]
    UnknownFormat,
    #[error("token payload is not valid base64: {0}")]
    Base64(String),
    #[error("token payload is shorter than its signature ({len} bytes)")]
    Truncated { len: usize },
    #[error("token payload is not valid JSON: {0}")]
    Json(String),
    #[error("token payload has no username")]
    MissingUsername,
}

/// Claims carried in the public part of an auth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(default, alias = "Expiration", skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    #[serde(default, alias = "Database", skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Strips a literal `Bearer ` prefix, leaving any other value untouched.
#[must_use]
pub fn bearer_token(authorization: &str) -> &str {
    authorization
        .strip_prefix(BEARER_PREFIX)
        .unwrap_or(authorization)
}

/// Decodes the public payload of `token` without checking its signature.
///
/// Accepts PASETO v2 public tokens and three-part JWTs.
///
/// # Errors
///
/// Returns a [`TokenError`] describing why the payload could not be read.
pub fn parse_public_payload(token: &str) -> Result<TokenPayload, TokenError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    let payload = if let Some(body) = token.strip_prefix(PASETO_V2_PUBLIC) {
        parse_paseto_payload(body)?
    } else if token.split('.').count() == 3 {
        parse_jwt_payload(token)?
    } else {
        return Err(TokenError::UnknownFormat);
    };

    if payload.username.is_empty() {
        return Err(TokenError::MissingUsername);
    }
    Ok(payload)
}

fn parse_paseto_payload(body: &str) -> Result<TokenPayload, TokenError> {
    // An optional footer follows a second dot.
    let encoded = body.split('.').next().unwrap_or_default();
    let raw = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| TokenError::Base64(e.to_string()))?;
    if raw.len() <= PASETO_SIGNATURE_LEN {
        return Err(TokenError::Truncated { len: raw.len() });
    }
    let message = &raw[..raw.len() - PASETO_SIGNATURE_LEN];
    serde_json::from_slice(message).map_err(|e| TokenError::Json(e.to_string()))
}

fn parse_jwt_payload(token: &str) -> Result<TokenPayload, TokenError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<TokenPayload>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::Base64(inner) => TokenError::Base64(inner.to_string()),
            jsonwebtoken::errors::ErrorKind::Json(inner) => TokenError::Json(inner.to_string()),
            _ => TokenError::Json(e.to_string()),
        })
}

/// Derives the tenant prefix for one request.
///
/// Returns `Ok(None)` when isolation is off, regardless of the header. With
/// isolation on, the `Authorization` value must carry a parseable token.
///
/// # Errors
///
/// Returns [`TokenError::Empty`] when isolation is on and no header was sent,
/// or the parse failure of the token otherwise.
pub fn derive_prefix(
    isolation: bool,
    authorization: Option<&str>,
) -> Result<Option<TenantPrefix>, TokenError> {
    if !isolation {
        return Ok(None);
    }
    let token = bearer_token(authorization.unwrap_or_default());
    let payload = parse_public_payload(token)?;
    Ok(Some(TenantPrefix::for_username(&payload.username)))
}
