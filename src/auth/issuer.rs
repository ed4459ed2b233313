/// Token issuance
///
/// Builds the access/refresh pair from a sanitized identity claim. Access
/// tokens are plain short-lived claims under the access secret; refresh
/// tokens additionally carry a random `jti` and the `type: "refresh"`
/// discriminator and are signed under the refresh secret.
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::auth::claims::{Claims, IdentityClaim, REFRESH_TOKEN_TYPE};
use crate::auth::token;
use crate::configuration::JwtSettings;
use crate::error::AppError;

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    config: JwtSettings,
}

impl TokenIssuer {
    pub fn new(config: JwtSettings) -> Self {
        Self { config }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.config
    }

    /// Sign an access token with the access secret and short expiry.
    pub fn generate_access_token(&self, identity: &IdentityClaim) -> Result<String, AppError> {
        let claims = Claims::new(
            identity,
            self.config.access_token_expiry,
            self.config.issuer.clone(),
        );
        token::sign(&claims, &self.config.access_secret)
    }

    /// Sign a refresh token: fresh random `jti`, `type: "refresh"`,
    /// refresh secret, long expiry.
    pub fn generate_refresh_token(&self, identity: &IdentityClaim) -> Result<String, AppError> {
        let mut claims = Claims::new(
            identity,
            self.config.refresh_token_expiry,
            self.config.issuer.clone(),
        );
        claims.token_type = Some(REFRESH_TOKEN_TYPE.to_string());
        claims.jti = Some(new_token_id());
        token::sign(&claims, self.config.refresh_signing_secret())
    }

    /// Mint a fresh pair for an identity. The identity's extras pass
    /// through the denylist inside `Claims::new`, so a caller handing us
    /// a raw record cannot leak credentials into a signed payload.
    pub fn generate_token_pair(&self, identity: &IdentityClaim) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.generate_access_token(identity)?,
            refresh_token: self.generate_refresh_token(identity)?,
        })
    }
}

/// Random 32-character alphanumeric token id.
fn new_token_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
