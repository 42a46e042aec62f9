//! Process configuration, loaded from environment variables.

use anyhow::Context;
use figment::{Figment, providers::Env};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Errors raised while interpreting configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown DATABASE_TLS mode `{0}` (expected auto, disable, require or verify-full)")]
    UnknownTlsMode(String),
}

/// How the database connection negotiates TLS.
///
/// `Auto` keeps the historical behaviour: no TLS for a local server, and an
/// encrypted but unverified connection for anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum TlsMode {
    #[default]
    Auto,
    Disable,
    /// Encrypt, but accept any server certificate.
    Require,
    VerifyFull,
}

impl TlsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::Auto => "auto",
            TlsMode::Disable => "disable",
            TlsMode::Require => "require",
            TlsMode::VerifyFull => "verify-full",
        }
    }
}

impl FromStr for TlsMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(TlsMode::Auto),
            "disable" | "off" => Ok(TlsMode::Disable),
            "require" => Ok(TlsMode::Require),
            "verify-full" | "verify_full" => Ok(TlsMode::VerifyFull),
            _ => Err(ConfigError::UnknownTlsMode(s.to_owned())),
        }
    }
}

impl TryFrom<String> for TlsMode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// Base level for this crate's log output, e.g. `debug` or `info`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub database_tls: TlsMode,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    /// Seconds to wait for a pooled connection before giving up.
    #[serde(default = "default_acquire_timeout")]
    pub database_acquire_timeout: u64,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_max_connections() -> u32 {
    4
}

fn default_acquire_timeout() -> u64 {
    4
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(Figment::new().merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        figment.extract().context("Failed to load config")
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.database_acquire_timeout)
    }
}
