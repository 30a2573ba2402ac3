use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CACHE_NAMESPACE: &str = "shopcore";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEV_DEFAULT_SESSION_SECRET: &str =
    "this_is_a_development_session_secret_that_is_at_least_64_characters_long";

/// Application configuration with validation.
///
/// Loaded from `config/default.toml`, an optional per-environment file and
/// `APP__`-prefixed environment variables, in that order.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Redis connection URL
    pub redis_url: String,

    /// Shared secret used to verify identity-provider session tokens
    #[validate(length(min = 64))]
    pub session_secret: String,

    /// Expected issuer claim on session tokens
    #[serde(default = "default_session_issuer")]
    pub session_issuer: String,

    /// Expected audience claim on session tokens
    #[serde(default = "default_session_audience")]
    pub session_audience: String,

    /// Shared secret for the maintenance (cron) endpoints
    #[serde(default)]
    pub cron_token: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment ("development", "staging", "production")
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// DB pool sizing
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Request timeout for the HTTP stack (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Key namespace for the storefront read cache
    #[serde(default = "default_cache_namespace")]
    pub cache_namespace: String,

    /// TTL for cached storefront payloads (seconds)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Shipping carrier API
    #[serde(default = "default_carrier_api_url")]
    pub carrier_api_url: String,
    #[serde(default)]
    pub carrier_api_key: Option<String>,

    /// Image host API (deletes on detach; uploads happen client-side)
    #[serde(default = "default_image_api_url")]
    pub image_api_url: String,
    #[serde(default)]
    pub image_api_key: Option<String>,

    /// Transactional email provider API
    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,
    #[serde(default)]
    pub email_api_key: Option<String>,
    #[serde(default = "default_email_from")]
    pub email_from: String,

    /// Secret for verifying payment-provider webhook signatures
    #[serde(default)]
    pub payment_webhook_secret: Option<String>,

    /// Capacity of the in-process event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_session_issuer() -> String {
    "https://sessions.shopcore.dev".to_string()
}
fn default_session_audience() -> String {
    "shopcore-api".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_cache_namespace() -> String {
    DEFAULT_CACHE_NAMESPACE.to_string()
}
fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
fn default_carrier_api_url() -> String {
    "https://api.carrier.example.com".to_string()
}
fn default_image_api_url() -> String {
    "https://api.images.example.com".to_string()
}
fn default_email_api_url() -> String {
    "https://api.mailer.example.com".to_string()
}
fn default_email_from() -> String {
    "no-reply@shopcore.dev".to_string()
}
fn default_event_channel_capacity() -> usize {
    1024
}

impl AppConfig {
    /// Minimal constructor used by tests and the maintenance bins.
    pub fn new(
        database_url: impl Into<String>,
        redis_url: impl Into<String>,
        session_secret: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            redis_url: redis_url.into(),
            session_secret: session_secret.into(),
            session_issuer: default_session_issuer(),
            session_audience: default_session_audience(),
            cron_token: None,
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            cache_namespace: default_cache_namespace(),
            cache_ttl_secs: default_cache_ttl_secs(),
            carrier_api_url: default_carrier_api_url(),
            carrier_api_key: None,
            image_api_url: default_image_api_url(),
            image_api_key: None,
            email_api_url: default_email_api_url(),
            email_api_key: None,
            email_from: default_email_from(),
            payment_webhook_secret: None,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("test")
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Loads configuration from files and environment, then validates it.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment =
        std::env::var("APP__ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .set_default("environment", environment.clone())?
        .set_default("database_url", "postgres://localhost/shopcore")?
        .set_default("redis_url", "redis://127.0.0.1:6379")?;

    // Development keeps a baked-in session secret so the server boots without
    // any files; anything else must provide one.
    if environment.eq_ignore_ascii_case(DEFAULT_ENV) {
        builder = builder.set_default("session_secret", DEV_DEFAULT_SESSION_SECRET)?;
    }

    let default_file = format!("{}/default", CONFIG_DIR);
    let env_file = format!("{}/{}", CONFIG_DIR, environment);
    if Path::new(CONFIG_DIR).is_dir() {
        builder = builder
            .add_source(File::with_name(&default_file).required(false))
            .add_source(File::with_name(&env_file).required(false));
    }

    let cfg: AppConfig = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    info!(environment = %cfg.environment, "configuration loaded");
    Ok(cfg)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        let _ = fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_uses_defaults() {
        let cfg = AppConfig::new(
            "sqlite::memory:",
            "redis://127.0.0.1:6379",
            DEV_DEFAULT_SESSION_SECRET,
            "127.0.0.1",
            18080,
            "test",
        );
        assert_eq!(cfg.port, 18080);
        assert_eq!(cfg.cache_namespace, "shopcore");
        assert!(cfg.is_development());
        assert!(cfg.should_allow_permissive_cors());
    }

    #[test]
    fn short_session_secret_fails_validation() {
        let cfg = AppConfig::new(
            "sqlite::memory:",
            "redis://127.0.0.1:6379",
            "short",
            "127.0.0.1",
            18080,
            "production",
        );
        assert!(cfg.validate().is_err());
    }
}
