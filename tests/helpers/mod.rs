//! Shared setup for database-backed integration tests.

#![allow(dead_code)]

use botstore::data::schema::initialize_schema;
use sqlx::PgPool;

/// Create the schema in the per-test database.
pub async fn setup(pool: &PgPool) {
    initialize_schema(pool)
        .await
        .expect("schema initialization should succeed");
}

pub async fn count_users(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .expect("failed to count users")
}

/// Column names and types of a table, in ordinal order.
pub async fn columns(pool: &PgPool, table: &str) -> Vec<(String, String)> {
    sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT column_name::text, data_type::text
        FROM information_schema.columns
        WHERE table_schema = current_schema() AND table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .expect("failed to list columns")
}
