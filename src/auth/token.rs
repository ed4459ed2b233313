/// Token codec
///
/// Deterministic sign/verify/decode over a claim set. Verification
/// failures are tagged, never string-matched: `Expired` means the token
/// was cryptographically sound but past its `exp`, `Invalid` covers
/// everything else (bad signature, malformed, wrong issuer). The two are
/// different animals downstream: expiry is recoverable by a refresh,
/// invalidity is not.
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::fmt;

use crate::auth::claims::Claims;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature checks out, `exp` is in the past.
    Expired,
    /// Bad signature, malformed token, or mismatched issuer.
    Invalid,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Expired => write!(f, "token expired"),
            TokenError::Invalid => write!(f, "token invalid"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Sign a claim set with the given secret. No side effects.
pub fn sign(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify a token against a secret and expected issuer.
///
/// Leeway is zero: a token one second past `exp` is already `Expired`.
pub fn verify(token: &str, secret: &str, issuer: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => {
            tracing::warn!("Token verification failed: {}", e);
            TokenError::Invalid
        }
    })
}

/// Decode a token without verifying signature or expiry.
///
/// Non-authoritative inspection only (logout bookkeeping, client-side
/// proactive expiry checks). Never a substitute for `verify`.
pub fn decode_unverified(token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}
