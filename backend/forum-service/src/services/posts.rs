/// Post service - creation (tree assignment), reads, edits, and status
/// transitions. Posts are never physically deleted; deletion is a status
/// change.
use crate::db::post_repo;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Post, PostStatus, PostType, SubType};
use crate::services::counters::CounterService;
use crate::services::subscriptions::SubscriptionService;
use crate::services::tree::{self, PostRequest, ThreadContext};
use crate::util;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostService {
    pool: PgPool,
    counters: CounterService,
}

impl PostService {
    pub fn new(pool: PgPool, view_window_minutes: i64) -> Self {
        let counters = CounterService::new(pool.clone(), view_window_minutes);
        Self { pool, counters }
    }

    /// Create a post. Tree assignment (type, root, parent, title, project)
    /// happens here, exactly once, before the record is visible; counter
    /// side effects land on the ancestors afterwards.
    pub async fn create_post(&self, author_id: Uuid, req: PostRequest) -> Result<Post> {
        // Load the thread context for replies; missing parents are user
        // error, unlike the root-supplied case handled in tree assignment.
        let thread = match req.parent_id {
            Some(parent_id) => {
                let parent = post_repo::find_post_by_id(&self.pool, parent_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("parent post {}", parent_id)))?;
                let root_id = parent.root_id.ok_or_else(|| {
                    AppError::Consistency(format!("parent post {} has no root", parent.id))
                })?;
                let root = if root_id == parent.id {
                    parent.clone()
                } else {
                    post_repo::find_post_by_id(&self.pool, root_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Consistency(format!("thread root {} missing", root_id))
                        })?
                };
                Some((parent, root))
            }
            None => None,
        };

        let ctx = thread.as_ref().map(|(parent, root)| ThreadContext {
            parent,
            root,
        });
        let resolved = tree::resolve_new_post(author_id, &req, ctx)?;
        let post = post_repo::create_post(&self.pool, &resolved).await?;

        // Counter maintenance on the ancestors.
        if let Some((parent, root)) = &thread {
            match post.ptype {
                PostType::Answer => {
                    post_repo::increment_reply_count(&self.pool, root.id).await?;
                    // An answer bumps the parent's edit stamp so active
                    // threads surface.
                    post_repo::touch_lastedit(&self.pool, parent.id, author_id).await?;
                }
                PostType::Comment => {
                    post_repo::adjust_comment_count(&self.pool, root.id, 1).await?;
                }
                _ => {}
            }
        }

        // The author follows their own thread; authors are excluded from
        // the subscriber count, so this does not touch subs_count.
        let subs = SubscriptionService::new(self.pool.clone());
        subs.subscribe(author_id, post.root_id.unwrap_or(post.id), SubType::Local)
            .await?;

        metrics::POSTS_CREATED_TOTAL
            .with_label_values(&[post.ptype.display()])
            .inc();

        tracing::info!(
            post_id = %post.id,
            ptype = post.ptype.display(),
            root_id = %post.root_id.unwrap_or(post.id),
            "post created"
        );

        Ok(post)
    }

    /// Fetch a post and record a view from the given IP, deduplicated by
    /// the configured time window.
    pub async fn view_post(&self, post_id: Uuid, ip: &str) -> Result<Post> {
        let post = post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        self.counters.record_view(post.id, ip).await?;

        Ok(post)
    }

    /// Edit a post's title, content, and tags. Replies keep their
    /// synthesized titles and carry no tags.
    pub async fn edit_post(
        &self,
        post_id: Uuid,
        editor_id: Uuid,
        title: Option<&str>,
        content: &str,
        tag_val: Option<&str>,
    ) -> Result<Post> {
        let existing = post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        let (title, tag_val, tags) = if existing.is_top_level() {
            let title = title.unwrap_or(&existing.title).trim().to_string();
            let tag_val = tag_val.unwrap_or(&existing.tag_val).trim().to_string();
            let tags = util::split_tags(&tag_val);
            (title, tag_val, tags)
        } else {
            (existing.title.clone(), String::new(), Vec::new())
        };

        let html = util::render_html(content);
        let post = post_repo::update_content(
            &self.pool, post_id, editor_id, &title, content, &html, &tag_val, &tags,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        // Saving an answer refreshes the parent's reply count.
        if post.ptype == PostType::Answer {
            if let Some(parent_id) = post.parent_id {
                self.counters.recompute_reply_count(parent_id).await?;
            }
        }

        Ok(post)
    }

    /// Transition a post's status. Deletion is always a transition to
    /// `Deleted`; rows are never removed.
    pub async fn set_status(&self, post_id: Uuid, status: PostStatus) -> Result<Post> {
        let post = post_repo::update_status(&self.pool, post_id, status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        // Opening or closing an answer changes its parent's open-answer
        // count.
        if post.ptype == PostType::Answer {
            if let Some(parent_id) = post.parent_id {
                self.counters.recompute_reply_count(parent_id).await?;
            }
        }

        Ok(post)
    }

    /// All posts of a thread, ordered for display.
    pub async fn get_thread(&self, root_id: Uuid) -> Result<Vec<Post>> {
        let root = post_repo::find_post_by_id(&self.pool, root_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", root_id)))?;

        if !root.is_top_level() {
            return Err(AppError::BadRequest(format!(
                "post {} is not a thread root",
                root_id
            )));
        }

        let thread = post_repo::get_thread(&self.pool, root.id).await?;
        Ok(thread)
    }

    /// Top-level listing, optionally filtered by tag.
    pub async fn list_top_level(
        &self,
        tag: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let tag = tag.map(|t| t.trim().to_lowercase());
        let posts = post_repo::list_top_level(&self.pool, tag.as_deref(), limit, offset).await?;
        Ok(posts)
    }
}
