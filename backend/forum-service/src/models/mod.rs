//! Data models for forum-service
//!
//! Persistent entities backed by PostgreSQL:
//! - `Post`: threaded forum posts (questions, answers, comments, ...)
//! - `Vote`: up/down/bookmark/accept marks on posts
//! - `Subscription`: a user following a thread
//! - `PostView`: per-IP view events used for view-count deduplication
//! - `Message`: user-to-user messages
//! - `User`: forum identity (authentication itself lives elsewhere)
//!
//! Enum columns are stored as SMALLINT with explicit discriminants so the
//! values stay stable across releases and match the legacy dataset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a post. Answers attach to top-level posts, comments attach to
/// answers or other comments; every other kind starts its own thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum PostType {
    Question = 0,
    Answer = 1,
    Job = 2,
    Forum = 3,
    Page = 4,
    Blog = 5,
    Comment = 6,
    Data = 7,
    Tutorial = 8,
    Board = 9,
    Tool = 10,
    News = 11,
}

impl PostType {
    /// True for types that start their own thread (root == parent == self).
    pub fn is_top_level(self) -> bool {
        !matches!(self, PostType::Answer | PostType::Comment)
    }

    /// Decode a raw legacy discriminant. Unknown values come back as
    /// `None` so callers can decide how to treat dirty source data.
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(PostType::Question),
            1 => Some(PostType::Answer),
            2 => Some(PostType::Job),
            3 => Some(PostType::Forum),
            4 => Some(PostType::Page),
            5 => Some(PostType::Blog),
            6 => Some(PostType::Comment),
            7 => Some(PostType::Data),
            8 => Some(PostType::Tutorial),
            9 => Some(PostType::Board),
            10 => Some(PostType::Tool),
            11 => Some(PostType::News),
            _ => None,
        }
    }

    /// Human-readable display name.
    pub fn display(self) -> &'static str {
        match self {
            PostType::Question => "Question",
            PostType::Answer => "Answer",
            PostType::Job => "Job",
            PostType::Forum => "Forum",
            PostType::Page => "Page",
            PostType::Blog => "Blog",
            PostType::Comment => "Comment",
            PostType::Data => "Data",
            PostType::Tutorial => "Tutorial",
            PostType::Board => "Bulletin Board",
            PostType::Tool => "Tool",
            PostType::News => "News",
        }
    }
}

/// Lifecycle status of a post. Posts are never physically deleted;
/// deletion is a transition to `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum PostStatus {
    Pending = 0,
    Open = 1,
    Closed = 2,
    Deleted = 3,
}

impl PostStatus {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(PostStatus::Pending),
            1 => Some(PostStatus::Open),
            2 => Some(PostStatus::Closed),
            3 => Some(PostStatus::Deleted),
            _ => None,
        }
    }
}

/// A post in the forum.
///
/// `root_id`/`parent_id` are non-null for every post created through the
/// service (a top-level post references itself). They are nullable in the
/// schema only because the bulk transfer creates posts first and links the
/// tree in a second pass.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    /// Source-derived unique identifier; used by the transfer pipeline to
    /// detect already-migrated records.
    pub uid: String,
    pub title: String,
    pub author_id: Uuid,
    pub lastedit_author_id: Uuid,
    pub ptype: PostType,
    pub status: PostStatus,
    pub root_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    /// Project the thread belongs to; inherited from the root.
    pub project_id: Option<Uuid>,
    pub vote_count: i32,
    pub view_count: i32,
    pub reply_count: i32,
    pub comment_count: i32,
    pub book_count: i32,
    pub subs_count: i32,
    /// Aggregate score of the whole thread; maintained on the root only.
    pub thread_score: i32,
    pub has_accepted: bool,
    pub sticky: bool,
    /// Canonical comma-separated tag string as entered.
    pub tag_val: String,
    /// Parsed, lowercased tag set used for filtering.
    pub tags: Vec<String>,
    /// Raw text as submitted.
    pub content: String,
    /// Rendered HTML served to readers.
    pub html: String,
    pub creation_date: DateTime<Utc>,
    pub lastedit_date: DateTime<Utc>,
}

impl Post {
    pub fn is_top_level(&self) -> bool {
        self.ptype.is_top_level()
    }
}

/// Kind of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum VoteType {
    Up = 0,
    Down = 1,
    Bookmark = 2,
    Accept = 3,
    Empty = 4,
}

impl VoteType {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(VoteType::Up),
            1 => Some(VoteType::Down),
            2 => Some(VoteType::Bookmark),
            3 => Some(VoteType::Accept),
            4 => Some(VoteType::Empty),
            _ => None,
        }
    }
}

/// A vote cast by a user on a post. One row per (author, post, type);
/// casting the same vote again removes it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub uid: String,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub vtype: VoteType,
    pub date: DateTime<Utc>,
}

/// How a subscriber wants to be notified about thread activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum SubType {
    Local = 0,
    Email = 1,
    NoMessages = 2,
}

impl SubType {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(SubType::Local),
            1 => Some(SubType::Email),
            2 => Some(SubType::NoMessages),
            _ => None,
        }
    }
}

/// Connects a user to a thread. Unique per (user, post).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub uid: String,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub stype: SubType,
    pub date: DateTime<Utc>,
}

/// A recorded view event keyed by (post, ip, date). Used to increment a
/// post's view count at most once per IP within a time window.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub ip: String,
    pub date: DateTime<Utc>,
}

/// Kind of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum MessageType {
    Local = 0,
    Email = 1,
    Digest = 2,
}

/// A message between two users. Delivery transport is out of scope; this
/// is the stored record backing inbox/outbox views.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub uid: String,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
    pub mtype: MessageType,
    pub unread: bool,
    pub parent_msg_id: Option<Uuid>,
    pub sent_date: DateTime<Utc>,
}

/// A forum identity. Authentication and sessions are handled by an
/// external collaborator; the forum only needs a stable id, a display
/// name, and the counters the UI shows.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub uid: String,
    pub username: String,
    pub email: String,
    pub score: i32,
    pub new_messages: i32,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_and_comments_are_not_top_level() {
        assert!(!PostType::Answer.is_top_level());
        assert!(!PostType::Comment.is_top_level());
        for t in [
            PostType::Question,
            PostType::Job,
            PostType::Forum,
            PostType::Page,
            PostType::Blog,
            PostType::Data,
            PostType::Tutorial,
            PostType::Board,
            PostType::Tool,
            PostType::News,
        ] {
            assert!(t.is_top_level(), "{:?} should be top-level", t);
        }
    }

    #[test]
    fn display_names_are_distinct_on_first_letter_for_replies() {
        // Title synthesis uses the first letter of the display name.
        assert_eq!(&PostType::Answer.display()[..1], "A");
        assert_eq!(&PostType::Comment.display()[..1], "C");
    }
}
