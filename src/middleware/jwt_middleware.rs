/// Access token verification middleware
///
/// Guards every authenticated route: extracts the bearer token, verifies
/// it against the access secret, and injects the decoded claims into
/// request extensions. Failure is terminal per request and the status
/// split matters: an expired token answers 401 with code `TOKEN_EXPIRED`
/// (the client may refresh and replay), anything invalid answers 403
/// (the client must not retry).
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{verify, TokenError};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::session::ACCESS_TOKEN_COOKIE;

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match extract_token(&req) {
            Some(token) => token,
            None => {
                tracing::warn!(path = %req.path(), "Missing or malformed bearer token");
                return Box::pin(async move { Err(AppError::from(AuthError::MissingToken).into()) });
            }
        };

        match verify(&token, &self.jwt_config.access_secret, &self.jwt_config.issuer) {
            Ok(claims) if claims.is_refresh() => {
                // Valid signature, wrong kind: a refresh token must never
                // pass as an access token.
                tracing::warn!(path = %req.path(), "Refresh token presented as access token");
                Box::pin(async move { Err(AppError::from(AuthError::TokenInvalid).into()) })
            }
            Ok(claims) => {
                req.extensions_mut().insert(claims.clone());

                tracing::debug!(
                    account_id = %claims.sub,
                    role = %claims.role,
                    "Access token verified"
                );

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(TokenError::Expired) => {
                Box::pin(async move { Err(AppError::from(AuthError::TokenExpired).into()) })
            }
            Err(TokenError::Invalid) => {
                tracing::warn!(path = %req.path(), "Access token failed verification");
                Box::pin(async move { Err(AppError::from(AuthError::TokenInvalid).into()) })
            }
        }
    }
}

/// Bearer token from the Authorization header (exactly `Bearer <token>`),
/// falling back to the access cookie when no header is present. A header
/// that is present but malformed fails closed rather than falling back.
fn extract_token(req: &ServiceRequest) -> Option<String> {
    if let Some(header) = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        return match header.split_once(' ') {
            Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => {
                Some(token.to_string())
            }
            _ => None,
        };
    }

    req.cookie(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}
