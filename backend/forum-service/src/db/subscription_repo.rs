use crate::models::{SubType, Subscription};
use crate::util;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use std::collections::HashSet;
use uuid::Uuid;

/// Find a user's subscription on a post.
pub async fn find_sub(
    pool: &PgPool,
    user_id: Uuid,
    post_id: Uuid,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT id, uid, user_id, post_id, stype, date
        FROM subscriptions
        WHERE user_id = $1 AND post_id = $2
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(sub)
}

/// Insert a subscription if none exists for (user, post).
/// Returns the new row, or None when the user was already subscribed.
pub async fn insert_sub(
    pool: &PgPool,
    user_id: Uuid,
    post_id: Uuid,
    stype: SubType,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (uid, user_id, post_id, stype)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, post_id) DO NOTHING
        RETURNING id, uid, user_id, post_id, stype, date
        "#,
    )
    .bind(util::get_uid(16))
    .bind(user_id)
    .bind(post_id)
    .bind(stype)
    .fetch_optional(pool)
    .await?;

    Ok(sub)
}

/// Change the notification type of an existing subscription. Returns the
/// updated row, or None when no subscription exists.
pub async fn update_sub_type(
    pool: &PgPool,
    user_id: Uuid,
    post_id: Uuid,
    stype: SubType,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sub = sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions SET stype = $3
        WHERE user_id = $1 AND post_id = $2
        RETURNING id, uid, user_id, post_id, stype, date
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .bind(stype)
    .fetch_optional(pool)
    .await?;

    Ok(sub)
}

/// Delete a subscription. Returns true if a row was removed.
pub async fn delete_sub(pool: &PgPool, user_id: Uuid, post_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND post_id = $2")
        .bind(user_id)
        .bind(post_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// All subscriptions on a thread root.
pub async fn list_for_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<Subscription>, sqlx::Error> {
    let subs = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT id, uid, user_id, post_id, stype, date
        FROM subscriptions
        WHERE post_id = $1
        ORDER BY date
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(subs)
}

// ============================================
// Transfer pipeline support
// ============================================

/// A subscription row prepared by the transfer pipeline.
#[derive(Debug, Clone)]
pub struct MigratedSub {
    pub uid: String,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub stype: SubType,
    pub date: DateTime<Utc>,
}

/// Batch-insert migrated subscriptions; existing uids and duplicate
/// (user, post) pairs are skipped.
pub async fn insert_migrated(pool: &PgPool, batch: &[MigratedSub]) -> Result<u64, sqlx::Error> {
    if batch.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<sqlx::Postgres> =
        QueryBuilder::new("INSERT INTO subscriptions (uid, user_id, post_id, stype, date) ");

    builder.push_values(batch, |mut b, sub| {
        b.push_bind(&sub.uid)
            .push_bind(sub.user_id)
            .push_bind(sub.post_id)
            .push_bind(sub.stype)
            .push_bind(sub.date);
    });
    builder.push(" ON CONFLICT DO NOTHING");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Set of existing subscription uids, used for idempotent re-runs.
pub async fn existing_uids(pool: &PgPool) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String,)>("SELECT uid FROM subscriptions")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(uid,)| uid).collect())
}

/// Count all subscriptions.
pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM subscriptions")
        .fetch_one(pool)
        .await?;

    Ok(row.get::<i64, _>("count"))
}

/// Recompute every root's subscriber count from the subscriptions across
/// its thread, excluding the thread author. Idempotent; used by the
/// transfer reconciliation pass.
pub async fn reconcile_subs_counts(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE posts r
        SET subs_count = (
            SELECT COUNT(DISTINCT s.user_id)
            FROM subscriptions s
            JOIN posts p ON p.id = s.post_id
            WHERE p.root_id = r.id AND s.user_id <> r.author_id
        )
        WHERE r.root_id = r.id
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
