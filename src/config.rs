//! TOML configuration.
//!
//! ```toml
//! name = "Living Room"
//! host = "192.168.1.40"
//! port = 31339          # optional
//! timeout_secs = 5      # optional
//! settle_ms = 300       # optional
//! debug = false         # optional
//!
//! [listings]            # optional; titles stay "channel N" without it
//! username = "me@example.com"
//! password = "secret"
//! refresh_secs = 1800   # optional
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::conn::{DEFAULT_PORT, SessionConfig};
use crate::listings::Credentials;
use crate::listings::client::DEFAULT_BASE_URL;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SETTLE_MS: u64 = 300;
pub const DEFAULT_REFRESH_SECS: u64 = 1800;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{message}")]
    Invalid { message: String },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { message: message.into() }
}

/// One receiver plus optional program-guide account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Friendly name used in spoken responses.
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Raise the log level to debug.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub listings: Option<ListingsConfig>,
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingsConfig {
    pub username: String,
    pub password: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

impl fmt::Debug for ListingsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("refresh_secs", &self.refresh_secs)
            .finish()
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}

impl Config {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.host.trim().is_empty() {
            return Err(invalid("host must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port must be non-zero"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs must be non-zero"));
        }
        if let Some(listings) = &self.listings {
            if listings.username.is_empty() || listings.password.is_empty() {
                return Err(invalid("listings username and password are both required"));
            }
            if listings.refresh_secs == 0 {
                return Err(invalid("listings.refresh_secs must be non-zero"));
            }
        }
        Ok(())
    }

    /// Transport settings for this receiver.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.host.clone(), self.port)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_settle(Duration::from_millis(self.settle_ms))
    }

    pub fn listings_credentials(&self) -> Option<Credentials> {
        self.listings.as_ref().map(|l| Credentials::new(l.username.clone(), l.password.clone()))
    }

    /// Interval between guide refreshes, if listings are configured.
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.listings.as_ref().map(|l| Duration::from_secs(l.refresh_secs))
    }
}
