use crate::models::User;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Create a forum user.
pub async fn create_user(
    pool: &PgPool,
    uid: &str,
    username: &str,
    email: &str,
) -> Result<User, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (uid, username, email)
        VALUES ($1, $2, $3)
        RETURNING id, uid, username, email, score, new_messages, is_active, date_joined
        "#,
    )
    .bind(uid)
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

/// Find a user by ID
pub async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, uid, username, email, score, new_messages, is_active, date_joined
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Atomically adjust a user's unread-message counter, clamped at zero.
pub async fn adjust_new_messages(pool: &PgPool, user_id: Uuid, delta: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET new_messages = GREATEST(new_messages + $2, 0) WHERE id = $1")
        .bind(user_id)
        .bind(delta)
        .execute(pool)
        .await?;

    Ok(())
}

// ============================================
// Transfer pipeline support
// ============================================

/// A user row prepared by the transfer pipeline.
#[derive(Debug, Clone)]
pub struct MigratedUser {
    pub uid: String,
    pub username: String,
    pub email: String,
    pub score: i32,
    pub new_messages: i32,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Batch-insert migrated users; rows whose uid already exists are skipped.
pub async fn insert_migrated(pool: &PgPool, batch: &[MigratedUser]) -> Result<u64, sqlx::Error> {
    if batch.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
        "INSERT INTO users (uid, username, email, score, new_messages, is_active, date_joined) ",
    );

    builder.push_values(batch, |mut b, user| {
        b.push_bind(&user.uid)
            .push_bind(&user.username)
            .push_bind(&user.email)
            .push_bind(user.score)
            .push_bind(user.new_messages)
            .push_bind(user.is_active)
            .push_bind(user.date_joined);
    });
    builder.push(" ON CONFLICT (uid) DO NOTHING");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Set of existing user uids, used for idempotent re-runs.
pub async fn existing_uids(pool: &PgPool) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String,)>("SELECT uid FROM users")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(uid,)| uid).collect())
}

/// Map of user uid to target id, used to resolve legacy cross-references.
pub async fn uid_map(pool: &PgPool) -> Result<HashMap<String, Uuid>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, Uuid)>("SELECT uid, id FROM users")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().collect())
}

/// Count all users.
pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await?;

    Ok(row.get::<i64, _>("count"))
}
