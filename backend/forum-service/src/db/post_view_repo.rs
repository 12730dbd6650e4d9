use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Record a view of a post from an IP address, deduplicated by time window.
///
/// Inserts a view event and bumps the post's view count only when no event
/// for the same (post, ip) pair exists within the trailing window. Both
/// writes happen in one transaction so a crash cannot count a view without
/// recording its event. Returns true when the view was counted.
pub async fn record_view(
    pool: &PgPool,
    post_id: Uuid,
    ip: &str,
    window_minutes: i64,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM post_views
            WHERE post_id = $1 AND ip = $2
              AND date > NOW() - ($3 * INTERVAL '1 minute')
        ) AS seen
        "#,
    )
    .bind(post_id)
    .bind(ip)
    .bind(window_minutes)
    .fetch_one(&mut *tx)
    .await?;

    if row.get::<bool, _>("seen") {
        tx.commit().await?;
        return Ok(false);
    }

    sqlx::query("INSERT INTO post_views (post_id, ip) VALUES ($1, $2)")
        .bind(post_id)
        .bind(ip)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

/// Number of stored view events for a post.
pub async fn count_views(pool: &PgPool, post_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM post_views WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool)
        .await?;

    Ok(row.get::<i64, _>("count"))
}
