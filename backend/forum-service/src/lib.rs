/// Forum Service Library
///
/// Threaded discussion forum backend: question/answer/comment trees,
/// votes, subscriptions, user messages, and a bulk transfer pipeline for
/// importing a legacy forum database.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers
/// - `models`: Data structures for posts, votes, subscriptions, messages
/// - `services`: Business logic layer (tree assignment, counters)
/// - `db`: Database access layer and repositories
/// - `migration`: Legacy database transfer pipeline
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Observability and metrics collection
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod migration;
pub mod models;
pub mod services;
pub mod util;

pub use config::Config;
pub use error::{AppError, Result};
