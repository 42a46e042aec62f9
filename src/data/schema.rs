//! Idempotent table creation for the bot's persistent state.
//!
//! There is no migration history: both tables are created with
//! `IF NOT EXISTS`, so this runs on every start.

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::utils::log_if_slow;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGINT PRIMARY KEY,
    username TEXT,
    balance DECIMAL(20, 2) DEFAULT 0,
    wallet TEXT,
    referred_by BIGINT,
    verified BOOLEAN DEFAULT FALSE,
    registered_at BIGINT NOT NULL,
    last_seen BIGINT NOT NULL,
    message_count INTEGER DEFAULT 0,
    activity_score DECIMAL(10, 4) DEFAULT 0,
    last_bonus_claim BIGINT DEFAULT 0,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS bot_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Create the `users` and `bot_settings` tables if they are missing.
///
/// The script is sent as a single batch on one connection. Errors are fatal to
/// startup; callers should not continue without a schema.
pub async fn initialize_schema(pool: &PgPool) -> Result<()> {
    let start = Instant::now();
    let mut conn = pool
        .acquire()
        .await
        .context("Failed to acquire connection for schema initialization")?;

    if let Err(e) = sqlx::raw_sql(SCHEMA).execute(&mut *conn).await {
        error!(error = ?e, "Database schema initialization failed");
        return Err(anyhow::Error::from(e).context("Failed to initialize database schema"));
    }

    log_if_slow(start, Duration::from_secs(2), "schema initialization");
    info!("Database schema initialized");
    Ok(())
}
