use crate::models::{Vote, VoteType};
use crate::util;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use std::collections::HashSet;
use uuid::Uuid;

/// Find a specific vote by author, post, and type.
pub async fn find_vote(
    pool: &PgPool,
    post_id: Uuid,
    author_id: Uuid,
    vtype: VoteType,
) -> Result<Option<Vote>, sqlx::Error> {
    let vote = sqlx::query_as::<_, Vote>(
        r#"
        SELECT id, uid, post_id, author_id, vtype, date
        FROM votes
        WHERE post_id = $1 AND author_id = $2 AND vtype = $3
        "#,
    )
    .bind(post_id)
    .bind(author_id)
    .bind(vtype)
    .fetch_optional(pool)
    .await?;

    Ok(vote)
}

/// Create a vote. Returns None when the same (author, post, type) vote
/// already exists.
pub async fn create_vote(
    pool: &PgPool,
    post_id: Uuid,
    author_id: Uuid,
    vtype: VoteType,
) -> Result<Option<Vote>, sqlx::Error> {
    let vote = sqlx::query_as::<_, Vote>(
        r#"
        INSERT INTO votes (uid, post_id, author_id, vtype)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (author_id, post_id, vtype) DO NOTHING
        RETURNING id, uid, post_id, author_id, vtype, date
        "#,
    )
    .bind(util::get_uid(16))
    .bind(post_id)
    .bind(author_id)
    .bind(vtype)
    .fetch_optional(pool)
    .await?;

    Ok(vote)
}

/// Delete a vote by id. Returns true if a row was removed.
pub async fn delete_vote(pool: &PgPool, vote_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM votes WHERE id = $1")
        .bind(vote_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================
// Transfer pipeline support
// ============================================

/// A vote row prepared by the transfer pipeline.
#[derive(Debug, Clone)]
pub struct MigratedVote {
    pub uid: String,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub vtype: VoteType,
    pub date: DateTime<Utc>,
}

/// Batch-insert migrated votes; rows whose uid already exists are skipped,
/// as are duplicate (author, post, type) tuples from dirty legacy data.
pub async fn insert_migrated(pool: &PgPool, batch: &[MigratedVote]) -> Result<u64, sqlx::Error> {
    if batch.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<sqlx::Postgres> =
        QueryBuilder::new("INSERT INTO votes (uid, post_id, author_id, vtype, date) ");

    builder.push_values(batch, |mut b, vote| {
        b.push_bind(&vote.uid)
            .push_bind(vote.post_id)
            .push_bind(vote.author_id)
            .push_bind(vote.vtype)
            .push_bind(vote.date);
    });
    builder.push(" ON CONFLICT DO NOTHING");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Set of existing vote uids, used for idempotent re-runs.
pub async fn existing_uids(pool: &PgPool) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String,)>("SELECT uid FROM votes")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(uid,)| uid).collect())
}

/// Count all votes.
pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM votes")
        .fetch_one(pool)
        .await?;

    Ok(row.get::<i64, _>("count"))
}
