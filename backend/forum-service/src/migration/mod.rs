//! Bulk transfer of a legacy forum database into this service.
//!
//! The transfer runs in an exclusive maintenance window, single-threaded
//! and batch-sequential, in the fixed order Users, Posts, Votes,
//! Subscriptions. It keeps no checkpoint files: "already migrated" is
//! re-derived from the destination on every run by loading the `uid` set,
//! so an interrupted run can simply be restarted.
//!
//! Posts are copied in two passes. Pass 1 creates every row with root and
//! parent left NULL while recording the legacy tree edges in memory; pass
//! 2 resolves those edges against the complete uid map and links the tree
//! with batch updates. A final reconciliation recomputes the aggregate
//! counters from the linked graph.

pub mod link;
pub mod pipeline;
pub mod source;

pub use pipeline::{MigrationPipeline, StreamReport};

/// Which streams a `migrate` invocation should run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrateOpts {
    pub users: bool,
    pub posts: bool,
    pub votes: bool,
    pub subs: bool,
}

impl MigrateOpts {
    /// No flags means every stream, in the fixed order.
    pub fn all() -> Self {
        Self {
            users: true,
            posts: true,
            votes: true,
            subs: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.users || self.posts || self.votes || self.subs)
    }
}
