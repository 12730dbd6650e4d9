/// Read-only access to the legacy database.
///
/// The legacy schema keys everything by BIGINT ids. Rows are streamed in
/// strict ascending id order with keyset pagination so a page boundary can
/// never skip or repeat a row.
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LegacyUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub score: i32,
    pub new_messages: i32,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LegacyPost {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    pub lastedit_user_id: Option<i64>,
    #[sqlx(rename = "type")]
    pub ptype: i16,
    pub status: i16,
    pub root_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub vote_count: i32,
    pub view_count: i32,
    pub reply_count: i32,
    pub book_count: i32,
    pub has_accepted: bool,
    pub tag_val: String,
    pub content: String,
    pub html: String,
    pub creation_date: DateTime<Utc>,
    pub lastedit_date: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LegacyVote {
    pub id: i64,
    pub author_id: i64,
    pub post_id: i64,
    #[sqlx(rename = "type")]
    pub vtype: i16,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LegacySub {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    #[sqlx(rename = "type")]
    pub stype: i16,
    pub date: DateTime<Utc>,
}

pub async fn fetch_users_after(
    pool: &PgPool,
    last_id: i64,
    page: i64,
) -> Result<Vec<LegacyUser>, sqlx::Error> {
    sqlx::query_as::<_, LegacyUser>(
        r#"
        SELECT id, username, email, score, new_messages, is_active, date_joined
        FROM users_user
        WHERE id > $1
        ORDER BY id
        LIMIT $2
        "#,
    )
    .bind(last_id)
    .bind(page)
    .fetch_all(pool)
    .await
}

pub async fn fetch_posts_after(
    pool: &PgPool,
    last_id: i64,
    page: i64,
) -> Result<Vec<LegacyPost>, sqlx::Error> {
    sqlx::query_as::<_, LegacyPost>(
        r#"
        SELECT id, title, author_id, lastedit_user_id, type, status,
               root_id, parent_id, vote_count, view_count, reply_count,
               book_count, has_accepted, tag_val, content, html,
               creation_date, lastedit_date
        FROM posts_post
        WHERE id > $1
        ORDER BY id
        LIMIT $2
        "#,
    )
    .bind(last_id)
    .bind(page)
    .fetch_all(pool)
    .await
}

pub async fn fetch_votes_after(
    pool: &PgPool,
    last_id: i64,
    page: i64,
) -> Result<Vec<LegacyVote>, sqlx::Error> {
    sqlx::query_as::<_, LegacyVote>(
        r#"
        SELECT id, author_id, post_id, type, date
        FROM posts_vote
        WHERE id > $1
        ORDER BY id
        LIMIT $2
        "#,
    )
    .bind(last_id)
    .bind(page)
    .fetch_all(pool)
    .await
}

pub async fn fetch_subs_after(
    pool: &PgPool,
    last_id: i64,
    page: i64,
) -> Result<Vec<LegacySub>, sqlx::Error> {
    sqlx::query_as::<_, LegacySub>(
        r#"
        SELECT id, user_id, post_id, type, date
        FROM posts_subscription
        WHERE id > $1
        ORDER BY id
        LIMIT $2
        "#,
    )
    .bind(last_id)
    .bind(page)
    .fetch_all(pool)
    .await
}
