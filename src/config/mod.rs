mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, CacheSettings, LogFormat, LoggingConfig, MetricsConfig,
    PaginationConfig, ServerConfig,
};
