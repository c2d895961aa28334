//! Bearer token validation
//!
//! Tokens are HS256 JWTs signed with the shared service secret. A token is
//! accepted when its signature verifies and its `exp` (and `nbf`, if
//! present) hold with zero leeway. No claim grants extra privilege.
//!
//! This module contains ONLY pure functions and types. The HTTP middleware
//! that applies them lives in the service crate.

use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time claims read from a token.
///
/// Any other claim is ignored whatever its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
}

/// Authentication failure reasons
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiAuthError {
    #[error("missing or malformed Authorization header")]
    MissingBearer,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively.
///
/// ```
/// use contract_common::auth::extract_bearer;
///
/// assert_eq!(extract_bearer(Some("Bearer abc")).unwrap(), "abc");
/// assert_eq!(extract_bearer(Some("bearer abc")).unwrap(), "abc");
/// assert!(extract_bearer(Some("Basic abc")).is_err());
/// assert!(extract_bearer(None).is_err());
/// ```
pub fn extract_bearer(header: Option<&str>) -> Result<&str, ApiAuthError> {
    let value = header.ok_or(ApiAuthError::MissingBearer)?;
    let (scheme, token) = value.split_once(' ').ok_or(ApiAuthError::MissingBearer)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiAuthError::MissingBearer);
    }
    Ok(token)
}

/// Verifies tokens against one shared secret
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate signature, algorithm and time claims
    pub fn validate(&self, token: &str) -> Result<Claims, ApiAuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiAuthError::Expired,
                ErrorKind::ImmatureSignature => ApiAuthError::NotYetValid,
                ErrorKind::InvalidSignature => ApiAuthError::InvalidSignature,
                _ => ApiAuthError::Invalid(e.to_string()),
            })
    }
}

/// Sign an HS256 token with the shared secret
pub fn issue_token<T: Serialize>(secret: &str, claims: &T) -> Result<String, ApiAuthError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiAuthError::Invalid(e.to_string()))
}
