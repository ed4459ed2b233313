/// Token claims
///
/// The payload carried inside access and refresh tokens: subject, role,
/// linked resident, standard JWT fields (RFC 7519), plus any denormalized
/// extras downstream screens need. Secrets never reach a claim set; see
/// `IdentityClaim::sanitized_extra`.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;

/// Value of the `type` claim that marks a refresh token.
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    /// Account role (admin, staff, resident)
    pub role: String,
    /// Linked resident record, when the account belongs to one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_id: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Token kind discriminator. Only refresh tokens carry one; an access
    /// token must never verify as a refresh token or vice versa.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Random token id, minted per refresh token for revocation bookkeeping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Denormalized fields carried for downstream consumers
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Build claims for an identity, stamping `iat` now and `exp` at
    /// `expiry_seconds` from now. A negative expiry produces an already
    /// expired token.
    pub fn new(identity: &IdentityClaim, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: identity.subject.to_string(),
            role: identity.role.clone(),
            resident_id: identity.resident_id.map(|id| id.to_string()),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            token_type: None,
            jti: None,
            extra: identity.sanitized_extra(),
        }
    }

    /// Extract the account ID from claims
    pub fn account_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Internal("Invalid account ID in token".to_string()))
    }

    /// True when the `type` claim marks this as a refresh token.
    pub fn is_refresh(&self) -> bool {
        self.token_type.as_deref() == Some(REFRESH_TOKEN_TYPE)
    }

    /// Check if the token has expired (non-authoritative; `verify` is the
    /// authority)
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

/// The sanitized identity a token pair is minted from.
///
/// Built from the current account record at login and again at every
/// refresh, so role changes take effect on the next rotation.
#[derive(Debug, Clone)]
pub struct IdentityClaim {
    pub subject: Uuid,
    pub role: String,
    pub resident_id: Option<Uuid>,
    /// Denormalized extras. Run through the denylist before signing.
    pub extra: Map<String, Value>,
}

impl IdentityClaim {
    pub fn new(subject: Uuid, role: impl Into<String>, resident_id: Option<Uuid>) -> Self {
        Self {
            subject,
            role: role.into(),
            resident_id,
            extra: Map::new(),
        }
    }

    /// Copy of `extra` with every secret-shaped field removed.
    ///
    /// Hard invariant: tokens are visible to the client, so nothing named
    /// like a credential may survive into a signed payload. Stripped keys
    /// are logged so a misbehaving caller shows up in the audit trail.
    pub fn sanitized_extra(&self) -> Map<String, Value> {
        let mut cleaned = Map::new();
        for (key, value) in &self.extra {
            if is_sensitive_field(key) {
                tracing::warn!(field = %key, "Stripped sensitive field from token claims");
                continue;
            }
            cleaned.insert(key.clone(), value.clone());
        }
        cleaned
    }
}

fn is_sensitive_field(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("password") || key.contains("secret") || key.ends_with("token")
}
