/// Session cookie pair
///
/// The transport envelope for the token pair: two HttpOnly cookies whose
/// lifetimes track their token's expiry. Attributes tighten in
/// production (`Secure`, `SameSite=None` for the cross-origin portal
/// frontend); local runs stay on `Lax` over plain HTTP.
use actix_web::cookie::{time::Duration, Cookie, SameSite};

use crate::configuration::{Environment, JwtSettings};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

#[derive(Clone)]
pub struct SessionCookies {
    secure: bool,
    same_site: SameSite,
    access_max_age: Duration,
    refresh_max_age: Duration,
}

impl SessionCookies {
    pub fn new(environment: Environment, jwt: &JwtSettings) -> Self {
        let (secure, same_site) = if environment.is_production() {
            (true, SameSite::None)
        } else {
            (false, SameSite::Lax)
        };
        Self {
            secure,
            same_site,
            access_max_age: Duration::seconds(jwt.access_token_expiry),
            refresh_max_age: Duration::seconds(jwt.refresh_token_expiry),
        }
    }

    pub fn access(&self, token: String) -> Cookie<'static> {
        self.build(ACCESS_TOKEN_COOKIE, token, self.access_max_age)
    }

    pub fn refresh(&self, token: String) -> Cookie<'static> {
        self.build(REFRESH_TOKEN_COOKIE, token, self.refresh_max_age)
    }

    /// Removal twin of the access cookie: same attributes, Max-Age 0.
    pub fn clear_access(&self) -> Cookie<'static> {
        let mut cookie = self.build(ACCESS_TOKEN_COOKIE, String::new(), self.access_max_age);
        cookie.make_removal();
        cookie
    }

    pub fn clear_refresh(&self) -> Cookie<'static> {
        let mut cookie = self.build(REFRESH_TOKEN_COOKIE, String::new(), self.refresh_max_age);
        cookie.make_removal();
        cookie
    }

    fn build(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build(name, value)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .max_age(max_age)
            .finish()
    }
}
