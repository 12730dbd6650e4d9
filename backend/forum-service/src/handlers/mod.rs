/// HTTP handlers for forum endpoints
///
/// This module contains handlers for:
/// - Posts: create, read, list, thread view, edit, status changes
/// - Votes: toggle up/down/bookmark/accept votes
/// - Subscriptions: thread subscriptions and subscriber listings
/// - Messages: user-to-user messages with unread tracking
pub mod messages;
pub mod posts;
pub mod subscriptions;
pub mod votes;

// Re-export handler functions at module level
pub use messages::{inbox, mark_read, outbox, send_message};
pub use posts::{
    create_post, delete_post, edit_post, get_post, get_thread, list_posts, set_post_status,
};
pub use subscriptions::{list_subscriptions, subscribe, unsubscribe};
pub use votes::toggle_vote;
