//! Authentication and authorization
//!
//! Two credentials guard the API: the shared cron secret presented by the
//! scheduler on trigger endpoints, and operator JWTs on the admin surface.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT claims of an operator token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorClaims {
    /// Subject (operator ID)
    pub sub: String,
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing role: {0}")]
    MissingRole(String),
}

/// Outcome of checking a cron trigger's credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronAuth {
    Authorized,
    /// Header missing, malformed or wrong
    Rejected,
    /// No secret configured; triggers are disabled
    Unconfigured,
}

/// Creates a new JWT token
pub fn create_token(
    user_id: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = OperatorClaims {
        sub: user_id.to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<OperatorClaims, AuthError> {
    let token_data = decode::<OperatorClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks if the operator has the required role; `admin` implies every role
pub fn has_role(claims: &OperatorClaims, required_role: &str) -> bool {
    claims
        .roles
        .iter()
        .any(|r| r == required_role || r == roles::ADMIN)
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Checks a cron trigger's `Authorization` header against the configured secret
pub fn verify_cron_secret(header: Option<&str>, configured: Option<&str>) -> CronAuth {
    let Some(secret) = configured else {
        return CronAuth::Unconfigured;
    };
    match bearer_token(header) {
        Some(token) if constant_time_eq(token.as_bytes(), secret.as_bytes()) => CronAuth::Authorized,
        _ => CronAuth::Rejected,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Role names
pub mod roles {
    pub const OPERATOR: &str = "operator";
    pub const ADMIN: &str = "admin";
}
