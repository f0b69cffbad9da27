use serde::{Deserialize, Serialize};
use serde_variant::to_variant_name;
use std::{env, fs, path::Path};
use thiserror::Error;
use tracing::info;

/// Environment variable replacing `database.uri`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Environment variable replacing `jwt.secret_key`.
pub const JWT_SECRET_KEY_ENV: &str = "JWT_SECRET_KEY";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// The URI for connecting to the database. For example:
    /// * Sqlite file: `sqlite://data.db?mode=rwc`
    /// * Sqlite in memory: `sqlite::memory:`
    #[serde(default = "default_database_uri")]
    pub uri: String,
    pub max_connections: Option<u32>,
    pub connection_timeout_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: default_database_uri(),
            max_connections: None,
            connection_timeout_seconds: None,
        }
    }
}

fn default_database_uri() -> String {
    "sqlite://data.db?mode=rwc".to_string()
}

/// Signing and lifetime settings for issued credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// Shared HS256 secret. Overridden by `JWT_SECRET_KEY` when set.
    #[serde(default)]
    pub secret_key: String,
    /// Lifetime of access tokens, in seconds.
    #[serde(default = "default_access_token_expires")]
    pub access_token_expires_secs: u64,
    /// Lifetime of refresh tokens, in seconds.
    #[serde(default = "default_refresh_token_expires")]
    pub refresh_token_expires_secs: u64,
}

impl JwtConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            access_token_expires_secs: default_access_token_expires(),
            refresh_token_expires_secs: default_refresh_token_expires(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

fn default_access_token_expires() -> u64 {
    15 * 60
}

fn default_refresh_token_expires() -> u64 {
    30 * 24 * 60 * 60
}

/// CORS configuration. An empty origin list allows any origin.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}
impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(to_variant_name(self).map_err(|_| std::fmt::Error)?)
    }
}
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Logger configuration for application use
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggerConfig {
    /// Enable log write to stdout
    pub enable: bool,

    /// Set the logger level.
    ///
    /// * options: `trace` | `debug` | `info` | `warn` | `error`
    #[serde(default)]
    pub level: LogLevel,

    /// Set the logger format.
    ///
    /// * options: `compact` | `pretty` | `json`
    #[serde(default)]
    pub format: LogFormat,

    /// Override our custom tracing filter.
    ///
    /// Set this to your own filter if you want to see traces from internal
    /// libraries. See more [here](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives)
    pub override_filter: Option<String>,
}

/// Sentry configuration for application use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentryConfig {
    pub dsn: String,
    pub traces_sample_rate: f32,
}

/// Server configuration for application use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// The address on which the server should listen on for incoming
    /// connections.
    #[serde(default = "default_binding")]
    pub binding: String,
    /// The port on which the server should listen for incoming connections.
    pub port: i32,
    /// The webserver host
    pub host: String,
}

fn default_binding() -> String {
    "localhost".to_string()
}

impl ServerConfig {
    #[must_use]
    pub fn full_url(&self) -> String {
        format!("{}:{}", self.binding, self.port)
    }
}

/// Complete application settings that combines all configuration layers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppSettings {
    #[serde(default)]
    pub logger: LoggerConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    pub sentry: Option<SentryConfig>,
}

impl AppSettings {
    pub fn new(config: &Path) -> Result<Self, ConfigError> {
        info!(selected_path =? config, "loading environment from");
        let content = fs::read_to_string(config)?;
        let mut settings = Self::from_toml(&content)?;
        settings.apply_env_overrides(|key| env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<Self>(content)?)
    }

    /// Replaces the database uri and signing secret with values from the
    /// environment lookup, when present and non-empty.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(DATABASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.database.uri = uri;
        }
        if let Some(secret) = lookup(JWT_SECRET_KEY_ENV).filter(|v| !v.is_empty()) {
            self.jwt.secret_key = secret;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret_key.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(())
    }
}

impl std::fmt::Display for AppSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut redacted = self.clone();
        redacted.jwt.secret_key = "<redacted>".to_string();
        let content = toml::to_string(&redacted).unwrap_or_default();
        write!(f, "{content}")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("JWT secret key is not configured (set jwt.secret_key or {JWT_SECRET_KEY_ENV})")]
    MissingSecret,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [server]
        port = 5000
        host = "http://localhost"

        [jwt]
        secret_key = "from-file"
    "#;

    #[test]
    fn test_defaults_are_filled_in() {
        let settings = AppSettings::from_toml(MINIMAL).unwrap();

        assert_eq!(settings.server.binding, "localhost");
        assert_eq!(settings.server.full_url(), "localhost:5000");
        assert_eq!(settings.database.uri, "sqlite://data.db?mode=rwc");
        assert_eq!(settings.jwt.access_token_expires_secs, 900);
        assert_eq!(settings.jwt.refresh_token_expires_secs, 2_592_000);
        assert!(settings.cors.allowed_origins.is_empty());
        assert!(settings.sentry.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_database_and_secret() {
        let mut settings = AppSettings::from_toml(MINIMAL).unwrap();
        settings.apply_env_overrides(|key| match key {
            DATABASE_URL_ENV => Some("sqlite::memory:".to_string()),
            JWT_SECRET_KEY_ENV => Some("from-env".to_string()),
            _ => None,
        });

        assert_eq!(settings.database.uri, "sqlite::memory:");
        assert_eq!(settings.jwt.secret_key, "from-env");
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut settings = AppSettings::from_toml(MINIMAL).unwrap();
        settings.apply_env_overrides(|_| Some(String::new()));

        assert_eq!(settings.jwt.secret_key, "from-file");
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let settings = AppSettings::from_toml(
            r#"
            [server]
            port = 5000
            host = "http://localhost"
            "#,
        )
        .unwrap();

        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn test_display_redacts_secret() {
        let settings = AppSettings::from_toml(MINIMAL).unwrap();
        let rendered = settings.to_string();

        assert!(!rendered.contains("from-file"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::default().to_string(), "info");
    }
}
