//! Counter maintenance: keeps denormalized counters consistent with the
//! authoritative relationship data so reads never aggregate.
//!
//! Triggers are explicit service-layer calls from the operation that causes
//! the side effect (post creation, vote toggle, subscription change); all
//! mutations go through the repositories' atomic field arithmetic.

use crate::db::{post_repo, post_view_repo};
use crate::error::Result;
use crate::metrics;
use crate::models::{Post, VoteType};
use sqlx::PgPool;
use uuid::Uuid;

pub struct CounterService {
    pool: PgPool,
    view_window_minutes: i64,
}

impl CounterService {
    pub fn new(pool: PgPool, view_window_minutes: i64) -> Self {
        Self {
            pool,
            view_window_minutes,
        }
    }

    /// Recount the open Answer children of a parent and write the result
    /// onto it. Called whenever an answer is saved or its status changes.
    pub async fn recompute_reply_count(&self, parent_id: Uuid) -> Result<i32> {
        let count = post_repo::recompute_reply_count(&self.pool, parent_id).await?;
        Ok(count)
    }

    /// Record a view from an IP address; the view count moves by 1 only if
    /// no view from that IP exists within the trailing window. Returns
    /// whether the view was counted.
    pub async fn record_view(&self, post_id: Uuid, ip: &str) -> Result<bool> {
        let counted =
            post_view_repo::record_view(&self.pool, post_id, ip, self.view_window_minutes).await?;

        let outcome = if counted { "counted" } else { "deduplicated" };
        metrics::POST_VIEWS_TOTAL.with_label_values(&[outcome]).inc();

        Ok(counted)
    }

    /// Adjust the subscriber count on a thread root; never drops below 0.
    pub async fn adjust_subs_count(&self, root_id: Uuid, delta: i32) -> Result<()> {
        post_repo::adjust_subs_count(&self.pool, root_id, delta).await?;
        Ok(())
    }

    /// Apply a vote's counter effects. `sign` is +1 when the vote is cast
    /// and -1 when it is retracted.
    ///
    /// Thread score lives on the root and moves with up and down votes
    /// anywhere in the thread; bookmark votes touch only the voted post.
    pub async fn apply_vote_effect(
        &self,
        post: &Post,
        vtype: VoteType,
        sign: i32,
    ) -> Result<()> {
        let root_id = post.root_id.unwrap_or(post.id);

        match vtype {
            VoteType::Up => {
                post_repo::adjust_vote_count(&self.pool, post.id, sign).await?;
                post_repo::adjust_thread_score(&self.pool, root_id, sign).await?;
            }
            VoteType::Down => {
                post_repo::adjust_vote_count(&self.pool, post.id, -sign).await?;
                post_repo::adjust_thread_score(&self.pool, root_id, -sign).await?;
            }
            VoteType::Bookmark => {
                post_repo::adjust_book_count(&self.pool, post.id, sign).await?;
            }
            VoteType::Accept => {
                post_repo::set_has_accepted(&self.pool, post.id, root_id, sign > 0).await?;
            }
            VoteType::Empty => {}
        }

        Ok(())
    }
}
