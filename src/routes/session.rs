/// Session routes
///
/// Login, token refresh, logout, and the current-account endpoint. These
/// are the only routes that touch the token lifecycle; everything else in
/// the portal consumes the session through the verifier middleware.
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::{decode_unverified, verify, verify_password, Claims, TokenError, TokenIssuer};
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::identity::IdentityStore;
use crate::session::{SessionCookies, REFRESH_TOKEN_COOKIE};
use crate::validators::is_valid_username;

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Refresh/logout request body. Optional on the wire: the refresh token
/// normally travels in the session cookie and the body is a fallback.
#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub role: String,
    #[serde(rename = "residentId", skip_serializing_if = "Option::is_none")]
    pub resident_id: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: AccountResponse,
}

/// POST /api/auth/login
///
/// Authenticate with username and password; on success both session
/// cookies are set. The tokens themselves stay HttpOnly and never appear
/// in the response body.
///
/// # Security Notes
/// - Same error message for "not found" and "wrong password"
///   (prevents account enumeration)
/// - Only issues tokens for active accounts
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<dyn IdentityStore>,
    issuer: web::Data<TokenIssuer>,
    cookies: web::Data<SessionCookies>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login");

    let username = is_valid_username(&form.username)?;

    let account = store
        .find_by_username(&username)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    if !account.is_active {
        return Err(AppError::Auth(AuthError::AccountInactive));
    }

    if !verify_password(&form.password, &account.password_hash)? {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let pair = issuer.generate_token_pair(&account.identity_claim())?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %account.id,
        role = %account.role,
        "Login succeeded"
    );

    Ok(HttpResponse::Ok()
        .cookie(cookies.access(pair.access_token))
        .cookie(cookies.refresh(pair.refresh_token))
        .json(LoginResponse {
            message: "Login successful".to_string(),
            user: account_response(&account),
        }))
}

/// POST /api/auth/refresh
///
/// Exchange a valid refresh token for a fresh pair. The token is read
/// from the `refreshToken` cookie, falling back to the request body.
///
/// Contract:
/// - missing token: 400, no cookies touched
/// - expired: 403 "Refresh token expired"
/// - invalid signature, wrong token type, account gone or inactive:
///   403 "Invalid refresh token" (one message for all three; the real
///   reason goes to the log only)
/// - success: both cookies re-set, 200
///
/// Claims are rebuilt from the current account record, so a role change
/// takes effect on the next rotation rather than at refresh-token expiry.
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    store: web::Data<dyn IdentityStore>,
    issuer: web::Data<TokenIssuer>,
    cookies: web::Data<SessionCookies>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let token = refresh_token_from(&req, &body).ok_or_else(|| {
        AppError::Validation(ValidationError::EmptyField("refreshToken".to_string()))
    })?;

    let jwt = issuer.settings();
    let claims = verify(&token, jwt.refresh_signing_secret(), &jwt.issuer).map_err(|e| match e {
        TokenError::Expired => AuthError::RefreshExpired,
        TokenError::Invalid => AuthError::RefreshInvalid,
    })?;

    // Anti-confusion guard: an access token replayed here has a valid
    // signature but no `type: "refresh"` claim.
    if !claims.is_refresh() {
        tracing::warn!(
            request_id = %context.request_id,
            "Non-refresh token presented to the refresh endpoint"
        );
        return Err(AppError::Auth(AuthError::RefreshInvalid));
    }

    // A verified token with a garbage subject is still an invalid token.
    let account_id = claims
        .account_id()
        .map_err(|_| AuthError::RefreshInvalid)?;
    let account = match store.find_by_id(account_id).await? {
        Some(account) if account.is_active => account,
        Some(_) => {
            tracing::warn!(
                request_id = %context.request_id,
                account_id = %account_id,
                "Refresh rejected: account inactive"
            );
            return Err(AppError::Auth(AuthError::RefreshInvalid));
        }
        None => {
            tracing::warn!(
                request_id = %context.request_id,
                account_id = %account_id,
                "Refresh rejected: account no longer exists"
            );
            return Err(AppError::Auth(AuthError::RefreshInvalid));
        }
    };

    let pair = issuer.generate_token_pair(&account.identity_claim())?;

    // The superseded token stays cryptographically valid until its expiry;
    // its jti and fingerprint are logged so a future denylist has
    // something to key on.
    tracing::info!(
        request_id = %context.request_id,
        account_id = %account.id,
        superseded_jti = claims.jti.as_deref().unwrap_or("-"),
        superseded_fingerprint = %token_fingerprint(&token),
        "Session refreshed"
    );

    Ok(HttpResponse::Ok()
        .cookie(cookies.access(pair.access_token))
        .cookie(cookies.refresh(pair.refresh_token))
        .json(MessageResponse {
            message: "Session refreshed".to_string(),
        }))
}

/// POST /api/auth/logout
///
/// Fail-open on purpose: ending a session client-side must never be
/// blocked by an already-invalid token, so this handler is infallible.
/// The refresh token, when present and decodable, is inspected and its
/// identifiers logged (revocation bookkeeping; nothing is persisted),
/// then both cookies are cleared unconditionally.
pub async fn logout(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    cookies: web::Data<SessionCookies>,
) -> HttpResponse {
    match refresh_token_from(&req, &body) {
        Some(token) => match decode_unverified(&token) {
            Some(claims) => {
                tracing::info!(
                    account_id = %claims.sub,
                    jti = claims.jti.as_deref().unwrap_or("-"),
                    fingerprint = %token_fingerprint(&token),
                    "Logout: refresh token noted for revocation bookkeeping"
                );
            }
            None => {
                tracing::debug!("Logout with an undecodable refresh token");
            }
        },
        None => {
            tracing::debug!("Logout without a refresh token");
        }
    }

    HttpResponse::Ok()
        .cookie(cookies.clear_access())
        .cookie(cookies.clear_refresh())
        .json(MessageResponse {
            message: "Logged out".to_string(),
        })
}

/// GET /api/me
///
/// Current account behind the verifier; claims come from request
/// extensions, the record is re-read so deactivation shows up
/// immediately.
pub async fn me(
    claims: web::ReqData<Claims>,
    store: web::Data<dyn IdentityStore>,
) -> Result<HttpResponse, AppError> {
    let account_id = claims.account_id()?;

    let account = store
        .find_by_id(account_id)
        .await?
        .filter(|account| account.is_active)
        .ok_or(AppError::Auth(AuthError::AccountInactive))?;

    Ok(HttpResponse::Ok().json(account_response(&account)))
}

fn account_response(account: &crate::identity::AccountRecord) -> AccountResponse {
    AccountResponse {
        id: account.id.to_string(),
        username: account.username.clone(),
        role: account.role.clone(),
        resident_id: account.resident_id.map(|id| id.to_string()),
    }
}

/// Refresh token from the session cookie, else the request body.
fn refresh_token_from(req: &HttpRequest, body: &Option<web::Json<RefreshRequest>>) -> Option<String> {
    req.cookie(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| body.as_ref().and_then(|b| b.refresh_token.clone()))
}

/// SHA-256 fingerprint of a token, for logging. Raw tokens never reach
/// the log stream.
fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_not_the_token() {
        let token = "header.payload.signature";
        let first = token_fingerprint(token);
        let second = token_fingerprint(token);

        assert_eq!(first, second);
        assert_ne!(first, token);
        assert_eq!(first.len(), 64);
    }
}
