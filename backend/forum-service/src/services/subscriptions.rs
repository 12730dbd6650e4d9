/// Subscription service - thread-level subscriptions and subscriber counts.
///
/// Subscriptions always attach to the thread root: subscribing to a reply
/// subscribes to its thread. The root author's own subscription is not
/// reflected in subs_count.
use crate::db::{post_repo, subscription_repo};
use crate::error::{AppError, Result};
use crate::models::{Post, SubType, Subscription};
use sqlx::PgPool;
use uuid::Uuid;

pub struct SubscriptionService {
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe a user to the thread containing `post_id`. Requesting
    /// `NoMessages` removes the subscription instead.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        stype: SubType,
    ) -> Result<Option<Subscription>> {
        let root = self.resolve_root(post_id).await?;

        if stype == SubType::NoMessages {
            self.remove(user_id, &root).await?;
            return Ok(None);
        }

        match subscription_repo::insert_sub(&self.pool, user_id, root.id, stype).await? {
            Some(sub) => {
                if user_id != root.author_id {
                    post_repo::adjust_subs_count(&self.pool, root.id, 1).await?;
                }
                tracing::debug!(user_id = %user_id, post_id = %root.id, "subscribed to thread");
                Ok(Some(sub))
            }
            // Already subscribed; update the delivery preference in place.
            None => {
                let sub =
                    subscription_repo::update_sub_type(&self.pool, user_id, root.id, stype).await?;
                Ok(sub)
            }
        }
    }

    /// Remove a user's subscription to the thread containing `post_id`.
    pub async fn unsubscribe(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let root = self.resolve_root(post_id).await?;
        self.remove(user_id, &root).await
    }

    pub async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Subscription>> {
        let root = self.resolve_root(post_id).await?;
        Ok(subscription_repo::list_for_post(&self.pool, root.id).await?)
    }

    pub async fn find(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<Subscription>> {
        let root = self.resolve_root(post_id).await?;
        Ok(subscription_repo::find_sub(&self.pool, user_id, root.id).await?)
    }

    async fn remove(&self, user_id: Uuid, root: &Post) -> Result<bool> {
        let removed = subscription_repo::delete_sub(&self.pool, user_id, root.id).await?;
        if removed && user_id != root.author_id {
            post_repo::adjust_subs_count(&self.pool, root.id, -1).await?;
        }
        Ok(removed)
    }

    async fn resolve_root(&self, post_id: Uuid) -> Result<Post> {
        let post = post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;
        let root_id = post.root_id.unwrap_or(post.id);
        if root_id == post.id {
            return Ok(post);
        }
        post_repo::find_post_by_id(&self.pool, root_id)
            .await?
            .ok_or_else(|| AppError::Consistency(format!("thread root {} missing", root_id)))
    }
}
