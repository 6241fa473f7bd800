//! ZeroCater Configuration
//!
//! TOML-based configuration with environment variable overrides for the
//! gateway location, service-token signing and outbound HTTP behaviour.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Algorithms accepted for service tokens. Only the HMAC family is allowed
/// because both sides share a single secret.
pub const SUPPORTED_JWT_ALGORITHMS: &[&str] = &["HS256", "HS384", "HS512"];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub gateway: GatewayConfig,
    pub jwt: JwtConfig,
    pub http: HttpClientConfig,
}

/// Identity of the calling service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name asserted in outbound service tokens, e.g. `mp-orders`
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "zc-service".to_string(),
        }
    }
}

/// Gateway route table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// URL serving the route table
    pub root_path: String,

    /// How long a fetched route table may be reused. 0 disables caching.
    pub route_cache_ttl_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            root_path: "http://gateway:4000/".to_string(),
            route_cache_ttl_secs: 0,
        }
    }
}

impl GatewayConfig {
    pub fn route_cache_ttl(&self) -> Option<Duration> {
        (self.route_cache_ttl_secs > 0).then(|| Duration::from_secs(self.route_cache_ttl_secs))
    }
}

/// Service token signing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Pre-shared HMAC secret
    pub secret_key: String,
    pub algorithm: String,
    /// Scheme used in the Authorization header
    pub auth_header_prefix: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            algorithm: "HS256".to_string(),
            auth_header_prefix: "JWT".to_string(),
        }
    }
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: format!("zc-remote/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject settings that would only fail later, at the first outbound call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "service.name must not be empty".to_string(),
            ));
        }
        if self.gateway.root_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "gateway.root_path must not be empty".to_string(),
            ));
        }
        if self.jwt.secret_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "jwt.secret_key must be set".to_string(),
            ));
        }
        if !SUPPORTED_JWT_ALGORITHMS.contains(&self.jwt.algorithm.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "jwt.algorithm {} is not supported, expected one of {}",
                self.jwt.algorithm,
                SUPPORTED_JWT_ALGORITHMS.join(", ")
            )));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http.request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# ZeroCater service configuration
# Environment variables override these settings

[service]
name = "mp-orders"

[gateway]
root_path = "http://gateway:4000/"
route_cache_ttl_secs = 0  # 0 = fetch the route table on every call

[jwt]
secret_key = ""
algorithm = "HS256"  # HS256, HS384 or HS512
auth_header_prefix = "JWT"

[http]
connect_timeout_secs = 10
request_timeout_secs = 30
"#
        .to_string()
    }
}
