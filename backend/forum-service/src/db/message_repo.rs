use crate::models::{Message, MessageType};
use crate::util;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a message from one user to another.
pub async fn create_message(
    pool: &PgPool,
    sender_id: Uuid,
    recipient_id: Uuid,
    subject: &str,
    body: &str,
    mtype: MessageType,
    parent_msg_id: Option<Uuid>,
) -> Result<Message, sqlx::Error> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (uid, sender_id, recipient_id, subject, body, mtype, parent_msg_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, uid, sender_id, recipient_id, subject, body, mtype, unread,
                  parent_msg_id, sent_date
        "#,
    )
    .bind(util::get_uid(16))
    .bind(sender_id)
    .bind(recipient_id)
    .bind(subject)
    .bind(body)
    .bind(mtype)
    .bind(parent_msg_id)
    .fetch_one(pool)
    .await?;

    Ok(message)
}

/// All messages received by a user, newest first.
pub async fn inbox_for(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Message>, sqlx::Error> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, uid, sender_id, recipient_id, subject, body, mtype, unread,
               parent_msg_id, sent_date
        FROM messages
        WHERE recipient_id = $1
        ORDER BY sent_date DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// All messages sent by a user, newest first.
pub async fn outbox_for(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Message>, sqlx::Error> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, uid, sender_id, recipient_id, subject, body, mtype, unread,
               parent_msg_id, sent_date
        FROM messages
        WHERE sender_id = $1
        ORDER BY sent_date DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// Mark a message as read. Returns true when the message was unread.
pub async fn mark_read(pool: &PgPool, message_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE messages SET unread = FALSE WHERE id = $1 AND unread")
        .bind(message_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Find a message by ID
pub async fn find_message_by_id(
    pool: &PgPool,
    message_id: Uuid,
) -> Result<Option<Message>, sqlx::Error> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, uid, sender_id, recipient_id, subject, body, mtype, unread,
               parent_msg_id, sent_date
        FROM messages
        WHERE id = $1
        "#,
    )
    .bind(message_id)
    .fetch_optional(pool)
    .await?;

    Ok(message)
}
