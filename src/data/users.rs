//! User directory: first-contact registration and activity tracking.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use tracing::{debug, info, warn};

use crate::utils::now_millis;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Lower bound on elapsed hours when computing an activity score.
pub const MIN_ACTIVITY_HOURS: f64 = 0.01;

/// Chat-platform account id. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Option<Self> {
        (id != 0).then_some(Self(id))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user object as handed over by chat integrations, which name the id
/// field differently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Option<i64>,
    pub uid: Option<i64>,
}

/// Anything `ensure_user` accepts as a reference to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserIdentifier {
    Id(i64),
    Record(UserRecord),
}

impl UserIdentifier {
    /// The usable id, preferring `id` over `uid` for records.
    pub fn resolve(&self) -> Option<UserId> {
        match self {
            UserIdentifier::Id(id) => UserId::new(*id),
            UserIdentifier::Record(record) => record
                .id
                .and_then(UserId::new)
                .or_else(|| record.uid.and_then(UserId::new)),
        }
    }
}

impl From<i64> for UserIdentifier {
    fn from(id: i64) -> Self {
        UserIdentifier::Id(id)
    }
}

/// A row of the `users` table. `i64` timestamps are epoch milliseconds.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub balance: Option<Decimal>,
    pub wallet: Option<String>,
    pub referred_by: Option<i64>,
    pub verified: Option<bool>,
    pub registered_at: i64,
    pub last_seen: i64,
    pub message_count: Option<i32>,
    pub activity_score: Option<Decimal>,
    pub last_bonus_claim: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

const USER_SELECT: &str = "SELECT id, username, balance, wallet, referred_by, verified, \
            registered_at, last_seen, message_count, activity_score, last_bonus_claim, \
            created_at, updated_at \
     FROM users";

/// New message statistics for a user.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityUpdate {
    pub message_count: i32,
    pub activity_score: Decimal,
}

/// The set of columns a single `ensure_user` call writes on an existing row.
#[derive(Debug, Clone, PartialEq)]
pub struct UserUpdate {
    pub last_seen: i64,
    pub username: Option<String>,
    pub activity: Option<ActivityUpdate>,
}

/// Messages per hour since registration, with elapsed time floored at
/// [`MIN_ACTIVITY_HOURS`].
pub fn activity_score(message_count: i32, registered_at: i64, now: i64) -> f64 {
    let hours = now.saturating_sub(registered_at) as f64 / MILLIS_PER_HOUR;
    f64::from(message_count) / hours.max(MIN_ACTIVITY_HOURS)
}

/// Largest value a `DECIMAL(10, 4)` column holds.
fn activity_score_max() -> Decimal {
    Decimal::new(9_999_999_999, 4)
}

/// Convert a score to the stored representation: 4 decimal places, clamped
/// to the column's range.
fn to_stored_score(score: f64) -> Decimal {
    Decimal::from_f64(score)
        .map(|d| d.round_dp(4))
        .unwrap_or_else(activity_score_max)
        .min(activity_score_max())
}

/// Decide which columns to write for an existing user.
pub fn plan_update(
    user: &User,
    display_name: Option<&str>,
    track_activity: bool,
    now: i64,
) -> UserUpdate {
    let username = display_name
        .filter(|name| !name.is_empty() && user.username.as_deref() != Some(*name))
        .map(str::to_owned);

    let activity = track_activity.then(|| {
        let message_count = user.message_count.unwrap_or(0).saturating_add(1);
        let score = activity_score(message_count, user.registered_at, now);
        ActivityUpdate {
            message_count,
            activity_score: to_stored_score(score),
        }
    });

    UserUpdate {
        last_seen: now,
        username,
        activity,
    }
}

/// Fetch a user by id.
pub async fn get_user(pool: &PgPool, id: UserId) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE id = $1"))
        .bind(id.get())
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to load user {id}"))
}

/// Register a user on first contact, or refresh an existing one.
///
/// Returns `Ok(None)` without touching the database when `identifier` does
/// not resolve to a usable id. For a known user, `last_seen` is always bumped;
/// `username` is written only when a different non-empty name is given, and
/// message statistics only when `track_activity` is set. No other column is
/// written, so concurrent writers of e.g. `balance` are never overwritten.
pub async fn ensure_user(
    pool: &PgPool,
    identifier: &UserIdentifier,
    display_name: Option<&str>,
    track_activity: bool,
) -> Result<Option<UserId>> {
    let Some(id) = identifier.resolve() else {
        warn!(identifier = ?identifier, "ensure_user: invalid identifier");
        return Ok(None);
    };

    let now = now_millis();

    match get_user(pool, id).await? {
        None => {
            let username = display_name.unwrap_or("");
            sqlx::query(
                r#"
                INSERT INTO users (id, username, registered_at, last_seen)
                VALUES ($1, $2, $3, $3)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(id.get())
            .bind(username)
            .bind(now)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to insert user {id}"))?;

            info!(
                user_id = %id,
                username = display_name.unwrap_or("unknown"),
                "New user added"
            );
        }
        Some(user) => {
            let update = plan_update(&user, display_name, track_activity, now);
            apply_update(pool, id, &update).await?;
            debug!(
                user_id = %id,
                renamed = update.username.is_some(),
                message_count = ?update.activity.as_ref().map(|a| a.message_count),
                "user refreshed"
            );
        }
    }

    Ok(Some(id))
}

/// Write a planned update in one statement. Absent parts bind as NULL and
/// leave their column as it is in the row being updated.
async fn apply_update(pool: &PgPool, id: UserId, update: &UserUpdate) -> Result<()> {
    let (message_count, activity_score) = match &update.activity {
        Some(a) => (Some(a.message_count), Some(a.activity_score)),
        None => (None, None),
    };

    sqlx::query(
        r#"
        UPDATE users
        SET last_seen = $2,
            username = COALESCE($3, username),
            message_count = COALESCE($4, message_count),
            activity_score = COALESCE($5, activity_score),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1
        "#,
    )
    .bind(id.get())
    .bind(update.last_seen)
    .bind(update.username.as_deref())
    .bind(message_count)
    .bind(activity_score)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to update user {id}"))?;

    Ok(())
}
