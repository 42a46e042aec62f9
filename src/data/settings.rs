//! Bot-wide key-value settings, backed by the `bot_settings` table.
//!
//! Values are plain strings; callers decide how to interpret them. Counters
//! are stored as decimal integers and updated through [`increment`].

use sqlx::PgPool;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

/// Retrieve a value by key, or `None` if not present.
pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT value FROM bot_settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await
}

/// Retrieve a value parsed as `T`, or `None` if absent or unparseable.
pub async fn get_parsed<T: FromStr>(pool: &PgPool, key: &str) -> Result<Option<T>, sqlx::Error> {
    let value = get(pool, key).await?;
    Ok(value.and_then(|v| v.trim().parse().ok()))
}

/// Insert or overwrite a key. The value is stored in its `Display` form.
pub async fn set(pool: &PgPool, key: &str, value: impl Display) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO bot_settings (key, value, updated_at)
        VALUES ($1, $2, CURRENT_TIMESTAMP)
        ON CONFLICT (key)
        DO UPDATE SET value = EXCLUDED.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Read the leading integer of a stored value: optional whitespace, an
/// optional sign, then digits. `"2.5"` gives 2 and `"12 users"` gives 12.
/// Values with more digits than fit saturate at the `i64` bounds.
pub fn leading_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude = rest[..digits_len]
        .bytes()
        .try_fold(0i64, |acc, d| acc.checked_mul(10)?.checked_sub(i64::from(d - b'0')));
    // Accumulated as a negative number so i64::MIN is representable
    Some(match (magnitude, negative) {
        (Some(n), true) => n,
        (Some(n), false) => n.checked_neg().unwrap_or(i64::MAX),
        (None, true) => i64::MIN,
        (None, false) => i64::MAX,
    })
}

/// Add `delta` to an integer setting and return the new value.
///
/// The current value is read with [`leading_integer`]; a missing value or one
/// without a leading integer counts as 0. This is a plain read followed
/// by a write, not an atomic update: two callers incrementing the same key at
/// the same time can lose one of the increments.
pub async fn increment(pool: &PgPool, key: &str, delta: i64) -> Result<i64, sqlx::Error> {
    let current = get(pool, key)
        .await?
        .as_deref()
        .and_then(leading_integer)
        .unwrap_or(0);
    let next = current.saturating_add(delta);
    set(pool, key, next).await?;
    debug!(key, current, next, "setting incremented");
    Ok(next)
}
