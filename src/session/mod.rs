mod cookies;

pub use cookies::SessionCookies;
pub use cookies::ACCESS_TOKEN_COOKIE;
pub use cookies::REFRESH_TOKEN_COOKIE;
