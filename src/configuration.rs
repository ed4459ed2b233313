use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
    pub environment: Environment,
}

/// Deployment environment. Gates the session cookie policy: production
/// cookies are `Secure` with `SameSite=None`, everything else is `Lax`.
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "String")]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "production" => Ok(Environment::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    /// Access token signing key (required, `JWT_SECRET`)
    pub access_secret: String,
    /// Refresh token signing key (`JWT_REFRESH_SECRET`). Optional: falls
    /// back to the access secret, which weakens the access/refresh
    /// separation and is warned about at startup.
    pub refresh_secret: Option<String>,
    pub access_token_expiry: i64,  // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64, // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

impl JwtSettings {
    /// The key refresh tokens are signed and verified with.
    pub fn refresh_signing_secret(&self) -> &str {
        self.refresh_secret.as_deref().unwrap_or(&self.access_secret)
    }

    /// False when the deployment runs both token kinds off one secret.
    pub fn has_dedicated_refresh_secret(&self) -> bool {
        self.refresh_secret.is_some()
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.port", 8000)?
        .set_default("application.environment", "local")?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "password")?
        .set_default("database.port", 5432)?
        .set_default("database.host", "127.0.0.1")?
        .set_default("database.database_name", "barangay_portal")?
        .set_default("jwt.access_token_expiry", 900)?
        .set_default("jwt.refresh_token_expiry", 604_800)?
        .set_default("jwt.issuer", "barangay-portal")?
        .add_source(config::File::with_name("configuration").required(false))
        .set_override_option("jwt.access_secret", std::env::var("JWT_SECRET").ok())?
        .set_override_option("jwt.refresh_secret", std::env::var("JWT_REFRESH_SECRET").ok())?
        .set_override_option(
            "jwt.access_token_expiry",
            expiry_from_env("JWT_ACCESS_EXPIRY")?,
        )?
        .set_override_option(
            "jwt.refresh_token_expiry",
            expiry_from_env("JWT_REFRESH_EXPIRY")?,
        )?
        .set_override_option(
            "application.environment",
            std::env::var("APP_ENVIRONMENT").ok(),
        )?
        .build()?;
    settings.try_deserialize::<Settings>()
}

fn expiry_from_env(name: &str) -> Result<Option<i64>, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(None),
        Ok(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
            ConfigError::Message(format!(
                "{} must be a number of seconds, got `{}`",
                name, raw
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_settings(refresh_secret: Option<&str>) -> JwtSettings {
        JwtSettings {
            access_secret: "access-secret-key-at-least-32-chars!".to_string(),
            refresh_secret: refresh_secret.map(String::from),
            access_token_expiry: 900,
            refresh_token_expiry: 604_800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn refresh_secret_falls_back_to_access_secret() {
        let config = jwt_settings(None);
        assert_eq!(config.refresh_signing_secret(), config.access_secret);
        assert!(!config.has_dedicated_refresh_secret());
    }

    #[test]
    fn dedicated_refresh_secret_is_used_when_configured() {
        let config = jwt_settings(Some("refresh-secret-key-also-32-chars!"));
        assert_eq!(
            config.refresh_signing_secret(),
            "refresh-secret-key-also-32-chars!"
        );
        assert!(config.has_dedicated_refresh_secret());
    }

    #[test]
    fn environment_parses_known_values() {
        assert_eq!(
            Environment::try_from("local".to_string()).unwrap(),
            Environment::Local
        );
        assert_eq!(
            Environment::try_from("Production".to_string()).unwrap(),
            Environment::Production
        );
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
