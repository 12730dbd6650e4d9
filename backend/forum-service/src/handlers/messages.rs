/// Message handlers - HTTP endpoints for user-to-user messages
use crate::error::Result;
use crate::models::MessageType;
use crate::services::MessageService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageBody {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    pub body: String,
    #[serde(default = "default_mtype")]
    pub mtype: MessageType,
    pub parent_msg_id: Option<Uuid>,
}

fn default_mtype() -> MessageType {
    MessageType::Local
}

#[derive(Debug, Deserialize)]
pub struct MailboxParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
    pub user_id: Uuid,
}

/// Send a message to another user.
pub async fn send_message(
    pool: web::Data<PgPool>,
    body: web::Json<SendMessageBody>,
) -> Result<HttpResponse> {
    body.validate()?;

    let service = MessageService::new((**pool).clone());
    let message = service
        .send(
            body.sender_id,
            body.recipient_id,
            &body.subject,
            &body.body,
            body.mtype,
            body.parent_msg_id,
        )
        .await?;

    Ok(HttpResponse::Created().json(message))
}

/// Received messages, newest first.
pub async fn inbox(
    pool: web::Data<PgPool>,
    user_id: web::Path<Uuid>,
    query: web::Query<MailboxParams>,
) -> Result<HttpResponse> {
    let service = MessageService::new((**pool).clone());
    let messages = service.inbox(*user_id, query.limit, query.offset).await?;

    Ok(HttpResponse::Ok().json(messages))
}

/// Sent messages, newest first.
pub async fn outbox(
    pool: web::Data<PgPool>,
    user_id: web::Path<Uuid>,
    query: web::Query<MailboxParams>,
) -> Result<HttpResponse> {
    let service = MessageService::new((**pool).clone());
    let messages = service.outbox(*user_id, query.limit, query.offset).await?;

    Ok(HttpResponse::Ok().json(messages))
}

/// Mark a message read and keep the recipient's unread counter in step.
pub async fn mark_read(
    pool: web::Data<PgPool>,
    message_id: web::Path<Uuid>,
    body: web::Json<MarkReadBody>,
) -> Result<HttpResponse> {
    let service = MessageService::new((**pool).clone());
    let message = service.mark_read(body.user_id, *message_id).await?;

    Ok(HttpResponse::Ok().json(message))
}
