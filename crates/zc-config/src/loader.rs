//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "zc.toml",
    "./config/config.toml",
    "/etc/zc/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable
    /// overrides, then validate the result.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("ZC_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply overrides from a variable lookup (the process environment in
/// production).
pub(crate) fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Service
    if let Some(val) = lookup("ZC_SERVICE_NAME") {
        config.service.name = val;
    }

    // Gateway. GATEWAY_ROOT_PATH is the name every existing deployment sets.
    if let Some(val) = lookup("GATEWAY_ROOT_PATH") {
        config.gateway.root_path = val;
    }
    if let Some(val) = lookup("ZC_ROUTE_CACHE_TTL_SECS") {
        if let Ok(ttl) = val.parse() {
            config.gateway.route_cache_ttl_secs = ttl;
        }
    }

    // JWT
    if let Some(val) = lookup("ZC_JWT_SECRET_KEY") {
        config.jwt.secret_key = val;
    }
    if let Some(val) = lookup("ZC_JWT_ALGORITHM") {
        config.jwt.algorithm = val.to_uppercase();
    }
    if let Some(val) = lookup("ZC_JWT_AUTH_HEADER_PREFIX") {
        config.jwt.auth_header_prefix = val;
    }

    // HTTP
    if let Some(val) = lookup("ZC_HTTP_CONNECT_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse() {
            config.http.connect_timeout_secs = secs;
        }
    }
    if let Some(val) = lookup("ZC_HTTP_REQUEST_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse() {
            config.http.request_timeout_secs = secs;
        }
    }
    if let Some(val) = lookup("ZC_HTTP_USER_AGENT") {
        config.http.user_agent = val;
    }
}
