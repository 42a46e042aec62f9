//! Connection pool construction.

use crate::config::{Config, TlsMode};
use crate::utils::fmt_duration;
use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Hosts treated as a local server by [`TlsMode::Auto`].
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// Whether `host` refers to the local machine (including unix socket directories).
pub fn is_local_host(host: &str) -> bool {
    host.starts_with('/') || LOCAL_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h))
}

impl TlsMode {
    /// Resolve `Auto` into a concrete mode for the given host. Other modes pass through.
    pub fn resolve(self, host: &str) -> TlsMode {
        match self {
            TlsMode::Auto if is_local_host(host) => TlsMode::Disable,
            TlsMode::Auto => TlsMode::Require,
            other => other,
        }
    }

    fn ssl_mode(self) -> PgSslMode {
        match self {
            TlsMode::Disable => PgSslMode::Disable,
            TlsMode::Auto | TlsMode::Require => PgSslMode::Require,
            TlsMode::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

/// Build connect options from config, with the TLS policy applied.
pub fn connect_options(config: &Config) -> anyhow::Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(&config.database_url)
        .context("Failed to parse database URL")?;

    let tls = config.database_tls.resolve(options.get_host());
    if config.database_tls == TlsMode::Auto && tls == TlsMode::Require {
        warn!(
            host = options.get_host(),
            "DATABASE_TLS=auto: connecting with TLS but without certificate verification"
        );
    }

    Ok(options
        .ssl_mode(tls.ssl_mode())
        .log_statements(tracing::log::LevelFilter::Debug)
        .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1)))
}

/// Create the shared connection pool.
pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let options = connect_options(config)?;
    let host = options.get_host().to_owned();
    let acquire_timeout = config.acquire_timeout();

    let pool = PgPoolOptions::new()
        .min_connections(0)
        .max_connections(config.database_max_connections)
        .acquire_timeout(acquire_timeout)
        .idle_timeout(Duration::from_secs(60 * 2))
        .max_lifetime(Duration::from_secs(60 * 30))
        .connect_with(options)
        .await
        .context("Failed to create database pool")?;

    info!(
        host = %host,
        tls = %config.database_tls.resolve(&host),
        max_connections = config.database_max_connections,
        acquire_timeout = fmt_duration(acquire_timeout),
        idle_timeout = "2m",
        max_lifetime = "30m",
        "database pool established"
    );

    Ok(pool)
}
