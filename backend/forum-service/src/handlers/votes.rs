/// Vote handlers - HTTP endpoints for vote toggling
use crate::config::Config;
use crate::error::Result;
use crate::models::VoteType;
use crate::services::VoteService;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    pub author_id: Uuid,
    pub vtype: VoteType,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub applied: bool,
    pub vote_id: Option<Uuid>,
}

/// Toggle a vote on a post. Voting twice with the same type retracts it.
pub async fn toggle_vote(
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    post_id: web::Path<Uuid>,
    body: web::Json<VoteBody>,
) -> Result<HttpResponse> {
    let service = VoteService::new((**pool).clone(), config.counters.view_window_minutes);
    let outcome = service
        .toggle_vote(*post_id, body.author_id, body.vtype)
        .await?;

    Ok(HttpResponse::Ok().json(VoteResponse {
        applied: outcome.applied,
        vote_id: outcome.vote.map(|v| v.id),
    }))
}
