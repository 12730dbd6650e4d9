/// Vote service - toggling votes and routing their counter effects.
use crate::db::{post_repo, vote_repo};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Post, Vote, VoteType};
use crate::services::counters::CounterService;
use sqlx::PgPool;
use uuid::Uuid;

/// Outcome of a vote toggle.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    /// True when the vote now exists; false when it was retracted.
    pub applied: bool,
    pub vote: Option<Vote>,
}

pub struct VoteService {
    pool: PgPool,
    counters: CounterService,
}

impl VoteService {
    pub fn new(pool: PgPool, view_window_minutes: i64) -> Self {
        let counters = CounterService::new(pool.clone(), view_window_minutes);
        Self { pool, counters }
    }

    /// Toggle a vote: casting the same vote twice retracts it. Counter
    /// effects are applied with the matching sign.
    pub async fn toggle_vote(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        vtype: VoteType,
    ) -> Result<VoteOutcome> {
        if vtype == VoteType::Empty {
            return Err(AppError::BadRequest("empty vote type".to_string()));
        }

        let post = post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        self.check_permission(&post, author_id, vtype).await?;

        if let Some(existing) = vote_repo::find_vote(&self.pool, post.id, author_id, vtype).await? {
            vote_repo::delete_vote(&self.pool, existing.id).await?;
            self.counters.apply_vote_effect(&post, vtype, -1).await?;

            metrics::VOTES_TOTAL
                .with_label_values(&[vtype_label(vtype), "retracted"])
                .inc();

            return Ok(VoteOutcome {
                applied: false,
                vote: None,
            });
        }

        match vote_repo::create_vote(&self.pool, post.id, author_id, vtype).await? {
            Some(vote) => {
                self.counters.apply_vote_effect(&post, vtype, 1).await?;

                metrics::VOTES_TOTAL
                    .with_label_values(&[vtype_label(vtype), "applied"])
                    .inc();

                Ok(VoteOutcome {
                    applied: true,
                    vote: Some(vote),
                })
            }
            // A concurrent toggle won the insert; treat as already applied
            // without double-counting.
            None => Ok(VoteOutcome {
                applied: true,
                vote: vote_repo::find_vote(&self.pool, post.id, author_id, vtype).await?,
            }),
        }
    }

    async fn check_permission(&self, post: &Post, author_id: Uuid, vtype: VoteType) -> Result<()> {
        match vtype {
            VoteType::Up | VoteType::Down => {
                if post.author_id == author_id {
                    return Err(AppError::BadRequest(
                        "you may not vote on your own post".to_string(),
                    ));
                }
            }
            VoteType::Accept => {
                if post.ptype != crate::models::PostType::Answer {
                    return Err(AppError::BadRequest(
                        "only answers can be accepted".to_string(),
                    ));
                }
                // Only the thread author accepts answers.
                let root_id = post.root_id.unwrap_or(post.id);
                let root = post_repo::find_post_by_id(&self.pool, root_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Consistency(format!("thread root {} missing", root_id))
                    })?;
                if root.author_id != author_id {
                    return Err(AppError::BadRequest(
                        "only the thread author may accept an answer".to_string(),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn vtype_label(vtype: VoteType) -> &'static str {
    match vtype {
        VoteType::Up => "up",
        VoteType::Down => "down",
        VoteType::Bookmark => "bookmark",
        VoteType::Accept => "accept",
        VoteType::Empty => "empty",
    }
}
