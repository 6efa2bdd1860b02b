use std::time::Duration;

use serde::Deserialize;

use crate::domain::pagination::DEFAULT_PAGE_SIZE;

/// Application configuration
///
/// Built once by the process entry point and handed to the components that
/// need it.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
    pub pagination: PaginationConfig,
    pub auth: AuthConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Cache store selection and entry lifetime
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// `in_memory` or `redis`
    pub backend: String,
    /// TTL applied to every cached payload
    pub ttl_secs: u64,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    /// Entry bound for the in-memory backend
    pub max_capacity: u64,
    pub connection_timeout_ms: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret; a random one is generated when empty
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub jwt_issuer: String,
    /// Username of the staff account created on first start
    pub admin_username: String,
    pub admin_email: String,
    /// Generated and logged once when empty
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: "in_memory".to_string(),
            ttl_secs: 300,
            redis_url: None,
            key_prefix: Some("connectly".to_string()),
            max_capacity: 100_000,
            connection_timeout_ms: 2_000,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expiration_secs: 3600,
            jwt_issuer: "connectly".to_string(),
            admin_username: "admin".to_string(),
            admin_email: "admin@connectly.local".to_string(),
            admin_password: None,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
