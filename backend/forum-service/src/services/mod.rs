pub mod counters;
pub mod messages;
pub mod posts;
pub mod subscriptions;
pub mod tree;
pub mod votes;

pub use counters::CounterService;
pub use messages::MessageService;
pub use posts::PostService;
pub use subscriptions::SubscriptionService;
pub use votes::{VoteOutcome, VoteService};
