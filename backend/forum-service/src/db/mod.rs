//! Database access layer: sqlx repositories over PostgreSQL.
//!
//! Repositories are free functions taking `&PgPool`. Counter mutations are
//! expressed as atomic field arithmetic in SQL (`c = c + 1`, with
//! `GREATEST(c - 1, 0)` where the counter tracks membership) so they stay
//! correct under concurrent writers.

pub mod message_repo;
pub mod post_repo;
pub mod post_view_repo;
pub mod subscription_repo;
pub mod user_repo;
pub mod vote_repo;
