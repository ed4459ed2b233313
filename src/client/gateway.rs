/// Session-aware HTTP gateway
///
/// Every outbound call from the portal's features goes through here. The
/// gateway carries the session in a shared cookie jar and intercepts one
/// failure class only: a `401` on a request that has not been replayed
/// yet. It then joins the coordinator's refresh wave and replays the
/// request exactly once. Anything that is not a `401` passes through
/// untouched.
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::cookie::Jar;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::client::coordinator::{RefreshCoordinator, RefreshFailure};
use crate::session::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

#[derive(Debug)]
pub enum GatewayError {
    /// Network or protocol failure, passed through unchanged.
    Transport(reqwest::Error),
    /// The refresh wave failed. Terminal: the local session has been
    /// cleared and the expired hook has fired.
    SessionExpired(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Transport(e) => write!(f, "request failed: {}", e),
            GatewayError::SessionExpired(msg) => write!(f, "session expired: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err)
    }
}

type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

pub struct SessionGateway {
    http: reqwest::Client,
    origin: Url,
    jar: Arc<Jar>,
    coordinator: Arc<RefreshCoordinator>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl SessionGateway {
    pub fn new(origin: Url) -> Result<Self, GatewayError> {
        let jar = Arc::new(Jar::default());
        // The timeout is also what unblocks a wave whose refresh call
        // hangs: every queued request fails over the same deadline.
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            origin,
            jar,
            coordinator: Arc::new(RefreshCoordinator::new()),
            on_session_expired: None,
        })
    }

    /// Callback fired once per failed refresh wave; the place the portal
    /// frontend hangs its redirect-to-login.
    pub fn with_session_expired_hook(
        mut self,
        hook: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    /// Seed a cookie into the session jar (e.g. a session resumed from a
    /// stored refresh token).
    pub fn add_cookie(&self, cookie: &str) {
        self.jar.add_cookie_str(cookie, &self.origin);
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.url(path))
    }

    /// Send a request with transparent session recovery.
    ///
    /// A `401` on the first attempt joins the refresh wave, then replays
    /// the request once. A `401` on the replay propagates as a plain
    /// response: the replay path never re-enters the algorithm, which is
    /// what terminates the loop. Requests with streaming bodies cannot be
    /// cloned for replay; their `401`s pass through.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let replay = request.try_clone();
        let response = request.send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let replay = match replay {
            Some(replay) => replay,
            None => return Ok(response),
        };

        self.refresh_session().await?;

        Ok(replay.send().await?)
    }

    /// Log in and populate the session jar from the response cookies.
    pub async fn login(&self, username: &str, password: &str) -> Result<Response, GatewayError> {
        let response = self
            .post("/api/auth/login")
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        Ok(response)
    }

    /// End the session: best-effort server logout, then drop the local
    /// cookies regardless of the outcome.
    pub async fn logout(&self) -> Result<(), GatewayError> {
        let result = self.post("/api/auth/logout").send().await;
        clear_session_cookies(&self.jar, &self.origin);
        result?;
        Ok(())
    }

    async fn refresh_session(&self) -> Result<(), GatewayError> {
        let refresh = make_refresh(
            self.http.clone(),
            self.url("/api/auth/refresh"),
            self.jar.clone(),
            self.origin.clone(),
            self.on_session_expired.clone(),
        );

        self.coordinator
            .refresh(move || refresh)
            .await
            .map_err(|failure| GatewayError::SessionExpired(failure.message))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin.as_str().trim_end_matches('/'), path)
    }
}

/// The body of one refresh wave. Runs once however many callers join.
/// On failure it clears the local session and fires the expired hook,
/// so both happen exactly once per wave.
fn make_refresh(
    http: reqwest::Client,
    refresh_url: String,
    jar: Arc<Jar>,
    origin: Url,
    hook: Option<SessionExpiredHook>,
) -> BoxFuture<'static, Result<(), RefreshFailure>> {
    async move {
        tracing::debug!("Access token rejected; refreshing session");

        let outcome = match http.post(&refresh_url).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(RefreshFailure::new(format!(
                "refresh endpoint answered {}",
                response.status()
            ))),
            Err(e) => Err(RefreshFailure::new(format!("refresh request failed: {}", e))),
        };

        if let Err(failure) = &outcome {
            tracing::warn!(error = %failure, "Session refresh failed; clearing local session");
            clear_session_cookies(&jar, &origin);
            if let Some(hook) = hook {
                hook();
            }
        }

        outcome
    }
    .boxed()
}

fn clear_session_cookies(jar: &Jar, origin: &Url) {
    jar.add_cookie_str(
        &format!("{}=; Max-Age=0; Path=/", ACCESS_TOKEN_COOKIE),
        origin,
    );
    jar.add_cookie_str(
        &format!("{}=; Max-Age=0; Path=/", REFRESH_TOKEN_COOKIE),
        origin,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_double_slashes() {
        let gateway = SessionGateway::new(Url::parse("http://127.0.0.1:8000").unwrap()).unwrap();
        assert_eq!(
            gateway.url("/api/auth/refresh"),
            "http://127.0.0.1:8000/api/auth/refresh"
        );
    }
}
