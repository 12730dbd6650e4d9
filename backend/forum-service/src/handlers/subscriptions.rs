/// Subscription handlers - HTTP endpoints for thread subscriptions
use crate::error::Result;
use crate::models::SubType;
use crate::services::SubscriptionService;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    pub user_id: Uuid,
    #[serde(default = "default_sub_type")]
    pub stype: SubType,
}

fn default_sub_type() -> SubType {
    SubType::Local
}

/// Subscribe a user to the thread containing the post. A `NoMessages`
/// type clears the subscription instead.
pub async fn subscribe(
    pool: web::Data<PgPool>,
    post_id: web::Path<Uuid>,
    body: web::Json<SubscribeBody>,
) -> Result<HttpResponse> {
    let service = SubscriptionService::new((**pool).clone());
    match service.subscribe(body.user_id, *post_id, body.stype).await? {
        Some(sub) => Ok(HttpResponse::Ok().json(sub)),
        None => Ok(HttpResponse::NoContent().finish()),
    }
}

/// Remove a user's subscription to the thread containing the post.
pub async fn unsubscribe(
    pool: web::Data<PgPool>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (post_id, user_id) = path.into_inner();
    let service = SubscriptionService::new((**pool).clone());
    let removed = service.unsubscribe(user_id, post_id).await?;

    if removed {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::NotFound().finish())
    }
}

/// List subscriptions for the thread containing the post.
pub async fn list_subscriptions(
    pool: web::Data<PgPool>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = SubscriptionService::new((**pool).clone());
    let subs = service.list_for_post(*post_id).await?;

    Ok(HttpResponse::Ok().json(subs))
}
