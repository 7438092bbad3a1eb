use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> Environment {
    Environment::Development
}

/// Deployment environment. Controls whether error responses carry a stack field.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite:./data/keelson.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens. Generated fresh on every start when
    /// not configured, which invalidates outstanding tokens across restarts.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Access token lifetime in minutes. The refresh token issued alongside
    /// it lives this long plus ten days.
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    /// Bootstrap admin account created at startup when no admin exists.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            access_token_minutes: default_access_token_minutes(),
            admin_email: None,
            admin_password: None,
        }
    }
}

fn default_secret_key() -> String {
    // Generate a random secret if not provided
    uuid::Uuid::new_v4().to_string()
}

fn default_access_token_minutes() -> i64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: Option<String>,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_smtp_tls")]
    pub smtp_tls: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_address: None,
            from_name: default_from_name(),
            smtp_tls: default_smtp_tls(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Keelson".to_string()
}

fn default_smtp_tls() -> bool {
    true
}

impl EmailConfig {
    /// Email sending is optional; it is enabled once a host and sender exist.
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && self.from_address.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_origin")]
    pub origin: String,
    #[serde(default)]
    pub credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: default_cors_origin(),
            credentials: false,
        }
    }
}

fn default_cors_origin() -> String {
    "*".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse configuration file")?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables win over file values so deployments can keep
    /// secrets out of the config file.
    fn apply_env_overrides(&mut self) {
        if let Some(port) = env_parsed::<u16>("PORT") {
            self.server.port = port;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(secret) = env::var("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(minutes) = env_parsed::<i64>("TOKEN_EXPIRES_IN") {
            self.auth.access_token_minutes = minutes;
        }
        if let Ok(host) = env::var("MAIL_HOST") {
            self.email.smtp_host = Some(host);
        }
        if let Some(port) = env_parsed::<u16>("MAIL_PORT") {
            self.email.smtp_port = port;
        }
        if let Ok(username) = env::var("MAIL_USERNAME") {
            self.email.smtp_username = Some(username);
        }
        if let Ok(password) = env::var("MAIL_PASSWORD") {
            self.email.smtp_password = Some(password);
        }
        if let Ok(from) = env::var("MAIL_FROM") {
            self.email.from_address = Some(from);
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(origin) = env::var("CORS_ORIGIN") {
            self.cors.origin = origin;
        }
        if let Some(credentials) = env_parsed::<bool>("CORS_CREDENTIALS") {
            self.cors.credentials = credentials;
        }
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            email: EmailConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
