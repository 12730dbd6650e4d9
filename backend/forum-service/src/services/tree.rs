//! Tree assignment for new posts.
//!
//! Given a creation request and the (already loaded) parent and root of the
//! target thread, decides the post's type, root, parent, title, project,
//! and tags. This runs exactly once, at creation time, before the record
//! becomes visible to readers; root and parent are never recomputed later.
//!
//! The logic is pure so it can be tested without a database; the service
//! layer loads the thread context and persists the result.

use crate::db::post_repo::NewPost;
use crate::error::{AppError, Result};
use crate::models::{Post, PostStatus, PostType};
use crate::util;
use uuid::Uuid;

/// Synthesized titles keep at most this many characters of the root title.
const TITLE_INHERIT_CHARS: usize = 80;

/// Length of generated post uids.
const POST_UID_LEN: usize = 13;

/// A post creation request, after HTTP-level validation.
#[derive(Debug, Clone)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
    pub tag_val: String,
    pub ptype: Option<PostType>,
    pub status: Option<PostStatus>,
    pub parent_id: Option<Uuid>,
    pub root_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

/// The thread a reply attaches to. `root` equals `parent` when replying
/// directly to a top-level post.
#[derive(Debug, Clone, Copy)]
pub struct ThreadContext<'a> {
    pub parent: &'a Post,
    pub root: &'a Post,
}

/// Resolve a creation request into a fully-assigned post.
///
/// `thread` is None exactly when the request carries no parent; the caller
/// has already looked the parent and root up and 404s on a missing parent.
pub fn resolve_new_post(
    author_id: Uuid,
    req: &PostRequest,
    thread: Option<ThreadContext<'_>>,
) -> Result<NewPost> {
    // Root is always derived, never user-supplied. Supplying one without a
    // parent is an integrity violation in the caller, not user error.
    if req.root_id.is_some() && req.parent_id.is_none() {
        return Err(AppError::Consistency(
            "root may not be supplied at post creation".to_string(),
        ));
    }

    let id = Uuid::new_v4();
    let status = req.status.unwrap_or(PostStatus::Open);

    match thread {
        None => {
            // New thread: the post is its own root and parent.
            let ptype = req.ptype.unwrap_or(PostType::Forum);
            if !ptype.is_top_level() {
                return Err(AppError::BadRequest(format!(
                    "a post of type {} requires a parent",
                    ptype.display()
                )));
            }

            let mut tag_val = req.tag_val.trim().to_string();
            // Top-level posts other than questions also carry their kind
            // as a tag.
            if ptype != PostType::Question {
                let required = ptype.display().to_lowercase();
                let mut tags = util::split_tags(&tag_val);
                if !tags.contains(&required) {
                    tags.push(required);
                    tag_val = tags.join(",");
                }
            }
            let tags = util::split_tags(&tag_val);

            Ok(NewPost {
                id,
                uid: util::get_uid(POST_UID_LEN),
                title: req.title.trim().to_string(),
                author_id,
                ptype,
                status,
                root_id: id,
                parent_id: id,
                project_id: req.project_id,
                tag_val,
                tags,
                content: req.content.clone(),
                html: util::render_html(&req.content),
            })
        }
        Some(ctx) => {
            // The root is inherited from the parent, never recomputed.
            let root_id = ctx.root.id;

            // Comments may only attach to answers and comments; the
            // restriction carries one level at a time up the tree.
            let ptype = if matches!(ctx.parent.ptype, PostType::Answer | PostType::Comment) {
                PostType::Comment
            } else {
                match req.ptype {
                    Some(PostType::Answer) => PostType::Answer,
                    _ => PostType::Comment,
                }
            };

            // Title is inherited from the top level.
            let title = format!(
                "{}: {}",
                &ptype.display()[..1],
                util::truncate_chars(&ctx.root.title, TITLE_INHERIT_CHARS)
            );

            Ok(NewPost {
                id,
                uid: util::get_uid(POST_UID_LEN),
                title,
                author_id,
                ptype,
                status,
                root_id,
                parent_id: ctx.parent.id,
                project_id: ctx.root.project_id,
                tag_val: String::new(),
                tags: Vec::new(),
                content: req.content.clone(),
                html: util::render_html(&req.content),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request() -> PostRequest {
        PostRequest {
            title: "How do I align paired-end reads?".to_string(),
            content: "Some content".to_string(),
            tag_val: String::new(),
            ptype: Some(PostType::Question),
            status: None,
            parent_id: None,
            root_id: None,
            project_id: None,
        }
    }

    fn post(ptype: PostType, title: &str) -> Post {
        let id = Uuid::new_v4();
        Post {
            id,
            uid: "abc".to_string(),
            title: title.to_string(),
            author_id: Uuid::new_v4(),
            lastedit_author_id: Uuid::new_v4(),
            ptype,
            status: PostStatus::Open,
            root_id: Some(id),
            parent_id: Some(id),
            project_id: None,
            vote_count: 0,
            view_count: 0,
            reply_count: 0,
            comment_count: 0,
            book_count: 0,
            subs_count: 0,
            thread_score: 0,
            has_accepted: false,
            sticky: false,
            tag_val: String::new(),
            tags: Vec::new(),
            content: String::new(),
            html: String::new(),
            creation_date: Utc::now(),
            lastedit_date: Utc::now(),
        }
    }

    #[test]
    fn top_level_post_is_its_own_root_and_parent() {
        let resolved = resolve_new_post(Uuid::new_v4(), &request(), None).unwrap();
        assert_eq!(resolved.root_id, resolved.id);
        assert_eq!(resolved.parent_id, resolved.id);
        assert_eq!(resolved.ptype, PostType::Question);
    }

    #[test]
    fn supplied_root_is_a_consistency_error() {
        let mut req = request();
        req.root_id = Some(Uuid::new_v4());
        let err = resolve_new_post(Uuid::new_v4(), &req, None).unwrap_err();
        assert!(matches!(err, AppError::Consistency(_)));
    }

    #[test]
    fn supplied_root_with_parent_follows_the_parent() {
        let root = post(PostType::Question, "Root title");
        let mut req = request();
        req.ptype = Some(PostType::Answer);
        req.parent_id = Some(root.id);
        // A stray root id is ignored when a parent is present.
        req.root_id = Some(Uuid::new_v4());

        let ctx = ThreadContext {
            parent: &root,
            root: &root,
        };
        let resolved = resolve_new_post(Uuid::new_v4(), &req, Some(ctx)).unwrap();
        assert_eq!(resolved.root_id, root.id);
        assert_eq!(resolved.parent_id, root.id);
    }

    #[test]
    fn answer_under_question_keeps_its_type() {
        let root = post(PostType::Question, "Root title");
        let mut req = request();
        req.ptype = Some(PostType::Answer);
        req.parent_id = Some(root.id);

        let ctx = ThreadContext {
            parent: &root,
            root: &root,
        };
        let resolved = resolve_new_post(Uuid::new_v4(), &req, Some(ctx)).unwrap();
        assert_eq!(resolved.ptype, PostType::Answer);
        assert_eq!(resolved.title, format!("A: {}", root.title));
    }

    #[test]
    fn reply_to_answer_is_forced_to_comment() {
        let root = post(PostType::Question, "Root title");
        let mut answer = post(PostType::Answer, "A: Root title");
        answer.root_id = Some(root.id);
        answer.parent_id = Some(root.id);

        let mut req = request();
        req.ptype = Some(PostType::Answer);
        req.parent_id = Some(answer.id);

        let ctx = ThreadContext {
            parent: &answer,
            root: &root,
        };
        let resolved = resolve_new_post(Uuid::new_v4(), &req, Some(ctx)).unwrap();
        assert_eq!(resolved.ptype, PostType::Comment);
        assert_eq!(resolved.root_id, root.id);
        assert_eq!(resolved.parent_id, answer.id);
    }

    #[test]
    fn reply_to_comment_is_forced_to_comment() {
        let root = post(PostType::Question, "Root title");
        let mut comment = post(PostType::Comment, "C: Root title");
        comment.root_id = Some(root.id);
        comment.parent_id = Some(root.id);

        let mut req = request();
        req.ptype = None;
        req.parent_id = Some(comment.id);

        let ctx = ThreadContext {
            parent: &comment,
            root: &root,
        };
        let resolved = resolve_new_post(Uuid::new_v4(), &req, Some(ctx)).unwrap();
        assert_eq!(resolved.ptype, PostType::Comment);
    }

    #[test]
    fn reply_with_top_level_type_becomes_comment() {
        let root = post(PostType::Question, "Root title");
        let mut req = request();
        req.ptype = Some(PostType::Question);
        req.parent_id = Some(root.id);

        let ctx = ThreadContext {
            parent: &root,
            root: &root,
        };
        let resolved = resolve_new_post(Uuid::new_v4(), &req, Some(ctx)).unwrap();
        assert_eq!(resolved.ptype, PostType::Comment);
    }

    #[test]
    fn inherited_title_is_truncated() {
        let long_title = "x".repeat(200);
        let root = post(PostType::Question, &long_title);
        let mut req = request();
        req.ptype = Some(PostType::Answer);
        req.parent_id = Some(root.id);

        let ctx = ThreadContext {
            parent: &root,
            root: &root,
        };
        let resolved = resolve_new_post(Uuid::new_v4(), &req, Some(ctx)).unwrap();
        assert_eq!(resolved.title, format!("A: {}", "x".repeat(80)));
    }

    #[test]
    fn non_top_level_inherits_project() {
        let mut root = post(PostType::Question, "Root title");
        root.project_id = Some(Uuid::new_v4());
        let mut req = request();
        req.ptype = Some(PostType::Answer);
        req.parent_id = Some(root.id);

        let ctx = ThreadContext {
            parent: &root,
            root: &root,
        };
        let resolved = resolve_new_post(Uuid::new_v4(), &req, Some(ctx)).unwrap();
        assert_eq!(resolved.project_id, root.project_id);
    }

    #[test]
    fn answer_without_parent_is_rejected() {
        let mut req = request();
        req.ptype = Some(PostType::Answer);
        let err = resolve_new_post(Uuid::new_v4(), &req, None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn missing_type_defaults_to_forum_at_top_level() {
        let mut req = request();
        req.ptype = None;
        let resolved = resolve_new_post(Uuid::new_v4(), &req, None).unwrap();
        assert_eq!(resolved.ptype, PostType::Forum);
        assert!(resolved.tags.contains(&"forum".to_string()));
    }

    #[test]
    fn non_question_top_level_carries_its_kind_as_tag() {
        let mut req = request();
        req.ptype = Some(PostType::Job);
        req.tag_val = "hiring,remote".to_string();
        let resolved = resolve_new_post(Uuid::new_v4(), &req, None).unwrap();
        assert_eq!(resolved.tags, ["hiring", "remote", "job"].map(String::from));
    }
}
