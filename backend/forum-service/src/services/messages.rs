/// Message service - user-to-user messages and unread counters.
use crate::db::{message_repo, user_repo};
use crate::error::{AppError, Result};
use crate::models::{Message, MessageType};
use sqlx::PgPool;
use uuid::Uuid;

pub struct MessageService {
    pool: PgPool,
}

impl MessageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn send(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        subject: &str,
        body: &str,
        mtype: MessageType,
        parent_msg_id: Option<Uuid>,
    ) -> Result<Message> {
        if subject.trim().is_empty() {
            return Err(AppError::BadRequest("message subject is empty".to_string()));
        }

        user_repo::find_user_by_id(&self.pool, recipient_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", recipient_id)))?;

        let message = message_repo::create_message(
            &self.pool,
            sender_id,
            recipient_id,
            subject,
            body,
            mtype,
            parent_msg_id,
        )
        .await?;

        user_repo::adjust_new_messages(&self.pool, recipient_id, 1).await?;

        tracing::info!(
            message_id = %message.id,
            sender_id = %sender_id,
            recipient_id = %recipient_id,
            "message sent"
        );

        Ok(message)
    }

    pub async fn inbox(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Message>> {
        Ok(message_repo::inbox_for(&self.pool, user_id, limit, offset).await?)
    }

    pub async fn outbox(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Message>> {
        Ok(message_repo::outbox_for(&self.pool, user_id, limit, offset).await?)
    }

    /// Mark a message read. The unread counter only moves when the message
    /// was actually unread, so repeated reads are harmless.
    pub async fn mark_read(&self, user_id: Uuid, message_id: Uuid) -> Result<Message> {
        let message = message_repo::find_message_by_id(&self.pool, message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("message {}", message_id)))?;

        if message.recipient_id != user_id {
            return Err(AppError::BadRequest(
                "only the recipient may read a message".to_string(),
            ));
        }

        let was_unread = message_repo::mark_read(&self.pool, message_id).await?;
        if was_unread {
            user_repo::adjust_new_messages(&self.pool, user_id, -1).await?;
        }

        message_repo::find_message_by_id(&self.pool, message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("message {}", message_id)))
    }
}
