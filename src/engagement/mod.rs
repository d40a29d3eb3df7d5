//! Social engagement core
//!
//! Reply threading, mutually exclusive like/dislike voting with counter
//! reconciliation, and save/unsave bookmarking, shared by comments and
//! reviews. Storage-agnostic behind `EngagementStore`.

pub mod engine;
pub mod memory;
pub mod mongo;
pub mod reconciler;
pub mod store;

pub use engine::Engagement;
pub use memory::MemoryEngagementStore;
pub use mongo::MongoEngagementStore;
pub use reconciler::CounterDelta;
pub use store::{
    CommentNode, EngagementStore, LedgerSet, NewComment, ReplyTarget, VotableKind, VoteKind,
};
