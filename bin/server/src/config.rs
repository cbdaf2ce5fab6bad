//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`SESSION__COOKIE_NAME`).

use crate::error::StartupError;
use rootcause::prelude::Report;
use serde::Deserialize;
use staffdesk_access::RoleCatalog;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the backend that owns sessions and roles.
    pub backend_url: String,

    /// JSON role catalog. The built-in catalog is used when unset.
    #[serde(default)]
    pub role_catalog_path: Option<PathBuf>,

    /// Directory served under `/assets`, if any.
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the backend's session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Timeout for session lookups against the backend.
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_cookie_name() -> String {
    "session".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

fn default_backend_timeout_ms() -> u64 {
    5000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure_cookies: default_secure_cookies(),
            backend_timeout_ms: default_backend_timeout_ms(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, Report<StartupError>> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(env: config::Environment) -> Result<Self, Report<StartupError>> {
        config::Config::builder()
            .add_source(env.separator("__").try_parsing(true))
            .build()
            .and_then(config::Config::try_deserialize::<Self>)
            .map_err(|e| {
                StartupError::Config {
                    reason: e.to_string(),
                }
                .into()
            })
    }

    /// Loads the configured role catalog, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured catalog file cannot be read or
    /// parsed. A bad catalog is never silently replaced by the default.
    pub fn role_catalog(&self) -> Result<RoleCatalog, Report<StartupError>> {
        let Some(path) = &self.role_catalog_path else {
            return Ok(RoleCatalog::builtin());
        };

        RoleCatalog::from_path(path).map_err(|e| {
            StartupError::Catalog {
                reason: e.to_string(),
            }
            .into()
        })
    }
}
