use crate::models::{Post, PostStatus, PostType, VoteType};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder, Row};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// All post columns, in the order the `Post` model expects.
const POST_COLUMNS: &str = "id, uid, title, author_id, lastedit_author_id, ptype, status, \
     root_id, parent_id, project_id, vote_count, view_count, reply_count, comment_count, \
     book_count, subs_count, thread_score, has_accepted, sticky, tag_val, tags, content, \
     html, creation_date, lastedit_date";

/// A fully-resolved post ready for insertion. Tree assignment has already
/// decided type, root, parent, and title; the repository only persists.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: Uuid,
    pub uid: String,
    pub title: String,
    pub author_id: Uuid,
    pub ptype: PostType,
    pub status: PostStatus,
    pub root_id: Uuid,
    pub parent_id: Uuid,
    pub project_id: Option<Uuid>,
    pub tag_val: String,
    pub tags: Vec<String>,
    pub content: String,
    pub html: String,
}

/// Insert a fully-resolved post and return the stored row.
///
/// The id is generated by the caller so that a top-level post can reference
/// itself as root and parent in the same statement.
pub async fn create_post(pool: &PgPool, new: &NewPost) -> Result<Post, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        INSERT INTO posts (id, uid, title, author_id, lastedit_author_id, ptype, status,
                           root_id, parent_id, project_id, tag_val, tags, content, html)
        VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(new.id)
    .bind(&new.uid)
    .bind(&new.title)
    .bind(new.author_id)
    .bind(new.ptype)
    .bind(new.status)
    .bind(new.root_id)
    .bind(new.parent_id)
    .bind(new.project_id)
    .bind(&new.tag_val)
    .bind(&new.tags)
    .bind(&new.content)
    .bind(&new.html)
    .fetch_one(pool)
    .await?;

    Ok(post)
}

/// Find a post by ID
pub async fn find_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
    ))
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

/// List top-level posts, newest first, optionally filtered by tag.
/// Deleted threads are excluded.
pub async fn list_top_level(
    pool: &PgPool,
    tag: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE root_id = id
          AND status <> $1
          AND ($2::text IS NULL OR $2 = ANY(tags))
        ORDER BY sticky DESC, creation_date DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(PostStatus::Deleted)
    .bind(tag)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// All posts of a thread: answers before comments, accepted and
/// higher-voted answers first, then chronological.
pub async fn get_thread(pool: &PgPool, root_id: Uuid) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE root_id = $1 AND status <> $2
        ORDER BY ptype, has_accepted DESC, vote_count DESC, creation_date
        "#
    ))
    .bind(root_id)
    .bind(PostStatus::Deleted)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Update a post's content after an edit; html and tags are re-derived by
/// the caller.
pub async fn update_content(
    pool: &PgPool,
    post_id: Uuid,
    editor_id: Uuid,
    title: &str,
    content: &str,
    html: &str,
    tag_val: &str,
    tags: &[String],
) -> Result<Option<Post>, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        UPDATE posts
        SET title = $2, content = $3, html = $4, tag_val = $5, tags = $6,
            lastedit_author_id = $7, lastedit_date = NOW()
        WHERE id = $1
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(post_id)
    .bind(title)
    .bind(content)
    .bind(html)
    .bind(tag_val)
    .bind(tags)
    .bind(editor_id)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

/// Update post status. Returns the updated row.
pub async fn update_status(
    pool: &PgPool,
    post_id: Uuid,
    status: PostStatus,
) -> Result<Option<Post>, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        UPDATE posts
        SET status = $2, lastedit_date = NOW()
        WHERE id = $1
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(post_id)
    .bind(status)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

/// Bump the last-edit stamp on a post (used on the parent when an answer
/// arrives).
pub async fn touch_lastedit(
    pool: &PgPool,
    post_id: Uuid,
    editor_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE posts
        SET lastedit_author_id = $2, lastedit_date = NOW()
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .bind(editor_id)
    .execute(pool)
    .await?;

    Ok(())
}

// ============================================
// Counter maintenance (atomic field arithmetic)
// ============================================

/// Atomically increment the reply count on a thread root (new answer).
pub async fn increment_reply_count(pool: &PgPool, root_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET reply_count = reply_count + 1 WHERE id = $1")
        .bind(root_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Recompute the reply count on a parent from its open Answer children.
/// Returns the fresh count.
pub async fn recompute_reply_count(pool: &PgPool, parent_id: Uuid) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE posts
        SET reply_count = (
            SELECT COUNT(*) FROM posts c
            WHERE c.parent_id = $1 AND c.id <> $1 AND c.ptype = $2 AND c.status = $3
        )
        WHERE id = $1
        RETURNING reply_count
        "#,
    )
    .bind(parent_id)
    .bind(PostType::Answer)
    .bind(PostStatus::Open)
    .fetch_one(pool)
    .await?;

    Ok(row.get::<i32, _>("reply_count"))
}

/// Adjust the comment count on a thread root, clamped at zero.
pub async fn adjust_comment_count(
    pool: &PgPool,
    root_id: Uuid,
    delta: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET comment_count = GREATEST(comment_count + $2, 0) WHERE id = $1")
        .bind(root_id)
        .bind(delta)
        .execute(pool)
        .await?;

    Ok(())
}

/// Adjust the vote count on a post. Unclamped: retracting a vote must
/// invert the cast exactly, so a down vote may take the count negative.
pub async fn adjust_vote_count(pool: &PgPool, post_id: Uuid, delta: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET vote_count = vote_count + $2 WHERE id = $1")
        .bind(post_id)
        .bind(delta)
        .execute(pool)
        .await?;

    Ok(())
}

/// Adjust the bookmark count on a post, clamped at zero.
pub async fn adjust_book_count(pool: &PgPool, post_id: Uuid, delta: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET book_count = GREATEST(book_count + $2, 0) WHERE id = $1")
        .bind(post_id)
        .bind(delta)
        .execute(pool)
        .await?;

    Ok(())
}

/// Adjust the subscriber count on a thread root, clamped at zero.
pub async fn adjust_subs_count(pool: &PgPool, root_id: Uuid, delta: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET subs_count = GREATEST(subs_count + $2, 0) WHERE id = $1")
        .bind(root_id)
        .bind(delta)
        .execute(pool)
        .await?;

    Ok(())
}

/// Adjust the aggregate thread score on a thread root. Unclamped for the
/// same reason as the vote count: cast and retraction must cancel.
pub async fn adjust_thread_score(
    pool: &PgPool,
    root_id: Uuid,
    delta: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET thread_score = thread_score + $2 WHERE id = $1")
        .bind(root_id)
        .bind(delta)
        .execute(pool)
        .await?;

    Ok(())
}

/// Set the accepted flag on an answer and refresh the root's flag from the
/// set of its open accepted answers.
pub async fn set_has_accepted(
    pool: &PgPool,
    post_id: Uuid,
    root_id: Uuid,
    value: bool,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE posts SET has_accepted = $2 WHERE id = $1")
        .bind(post_id)
        .bind(value)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        UPDATE posts
        SET has_accepted = EXISTS (
            SELECT 1 FROM posts a
            WHERE a.root_id = $1 AND a.ptype = $2 AND a.status = $3 AND a.has_accepted
              AND a.id <> $1
        )
        WHERE id = $1
        "#,
    )
    .bind(root_id)
    .bind(PostType::Answer)
    .bind(PostStatus::Open)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

// ============================================
// Transfer pipeline support
// ============================================

/// A post row prepared by the transfer pipeline. Root and parent are left
/// unset here; the link pass fills them once every post exists.
#[derive(Debug, Clone)]
pub struct MigratedPost {
    pub uid: String,
    pub title: String,
    pub author_id: Uuid,
    pub lastedit_author_id: Uuid,
    pub ptype: PostType,
    pub status: PostStatus,
    pub vote_count: i32,
    pub view_count: i32,
    pub reply_count: i32,
    pub book_count: i32,
    pub has_accepted: bool,
    pub tag_val: String,
    pub tags: Vec<String>,
    pub content: String,
    pub html: String,
    pub creation_date: DateTime<Utc>,
    pub lastedit_date: DateTime<Utc>,
}

/// Batch-insert migrated posts. Rows whose uid already exists are left
/// untouched, which is what makes re-running the transfer safe.
pub async fn insert_migrated(pool: &PgPool, batch: &[MigratedPost]) -> Result<u64, sqlx::Error> {
    if batch.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
        "INSERT INTO posts (uid, title, author_id, lastedit_author_id, ptype, status, \
         vote_count, view_count, reply_count, book_count, has_accepted, tag_val, tags, \
         content, html, creation_date, lastedit_date) ",
    );

    builder.push_values(batch, |mut b, post| {
        b.push_bind(&post.uid)
            .push_bind(&post.title)
            .push_bind(post.author_id)
            .push_bind(post.lastedit_author_id)
            .push_bind(post.ptype)
            .push_bind(post.status)
            .push_bind(post.vote_count)
            .push_bind(post.view_count)
            .push_bind(post.reply_count)
            .push_bind(post.book_count)
            .push_bind(post.has_accepted)
            .push_bind(&post.tag_val)
            .push_bind(&post.tags)
            .push_bind(&post.content)
            .push_bind(&post.html)
            .push_bind(post.creation_date)
            .push_bind(post.lastedit_date);
    });
    builder.push(" ON CONFLICT (uid) DO NOTHING");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Batch-update root and parent links resolved by the link pass.
pub async fn update_links(
    pool: &PgPool,
    links: &[(Uuid, Uuid, Uuid)],
) -> Result<u64, sqlx::Error> {
    if links.is_empty() {
        return Ok(0);
    }

    let ids: Vec<Uuid> = links.iter().map(|(id, _, _)| *id).collect();
    let roots: Vec<Uuid> = links.iter().map(|(_, root, _)| *root).collect();
    let parents: Vec<Uuid> = links.iter().map(|(_, _, parent)| *parent).collect();

    let result = sqlx::query(
        r#"
        UPDATE posts
        SET root_id = u.root_id, parent_id = u.parent_id
        FROM (SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[]))
             AS u(id, root_id, parent_id)
        WHERE posts.id = u.id
        "#,
    )
    .bind(&ids)
    .bind(&roots)
    .bind(&parents)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Map of existing post uids, used for idempotent re-runs.
pub async fn existing_uids(pool: &PgPool) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String,)>("SELECT uid FROM posts")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(uid,)| uid).collect())
}

/// Map of post uid to target id, used to resolve legacy cross-references.
pub async fn uid_map(pool: &PgPool) -> Result<HashMap<String, Uuid>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, Uuid)>("SELECT uid, id FROM posts")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().collect())
}

/// Count all posts (including deleted).
pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts")
        .fetch_one(pool)
        .await?;

    Ok(row.get::<i64, _>("count"))
}

/// Count migrated posts still missing a root or parent after linking.
pub async fn count_unlinked(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row =
        sqlx::query("SELECT COUNT(*) as count FROM posts WHERE root_id IS NULL OR parent_id IS NULL")
            .fetch_one(pool)
            .await?;

    Ok(row.get::<i64, _>("count"))
}

/// Recompute every post's reply count from its open Answer children.
/// Idempotent; used by the transfer reconciliation pass.
pub async fn reconcile_reply_counts(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE posts p
        SET reply_count = (
            SELECT COUNT(*) FROM posts c
            WHERE c.parent_id = p.id AND c.id <> p.id AND c.ptype = $1 AND c.status = $2
        )
        "#,
    )
    .bind(PostType::Answer)
    .bind(PostStatus::Open)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Recompute every root's comment count from the open comments in its
/// thread. Idempotent.
pub async fn reconcile_comment_counts(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE posts r
        SET comment_count = (
            SELECT COUNT(*) FROM posts c
            WHERE c.root_id = r.id AND c.ptype = $1 AND c.status = $2
        )
        WHERE r.root_id = r.id
        "#,
    )
    .bind(PostType::Comment)
    .bind(PostStatus::Open)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Recompute every root's thread score from the votes across its thread.
/// Idempotent.
pub async fn reconcile_thread_scores(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE posts r
        SET thread_score = (
            SELECT COALESCE(SUM(CASE v.vtype WHEN $1 THEN 1 WHEN $2 THEN -1 ELSE 0 END), 0)
            FROM votes v
            JOIN posts p ON p.id = v.post_id
            WHERE p.root_id = r.id
        )
        WHERE r.root_id = r.id
        "#,
    )
    .bind(VoteType::Up)
    .bind(VoteType::Down)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
