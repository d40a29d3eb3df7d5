//! Engagement storage seam
//!
//! The engine speaks to storage through `EngagementStore`. Ledger mutations
//! are guarded: each one is atomic and reports whether membership actually
//! changed, so the engine never runs a check-then-mutate sequence that a
//! concurrent request could race.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::reconciler::CounterDelta;
use crate::types::Result;

/// The two kinds of votable content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VotableKind {
    Comment,
    Review,
}

impl VotableKind {
    /// Lowercase noun for user-facing messages
    pub fn noun(&self) -> &'static str {
        match self {
            VotableKind::Comment => "comment",
            VotableKind::Review => "review",
        }
    }

    /// Capitalized noun for not-found messages
    pub fn noun_capitalized(&self) -> &'static str {
        match self {
            VotableKind::Comment => "Comment",
            VotableKind::Review => "Review",
        }
    }
}

/// The two mutually exclusive vote states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    pub fn opposite(&self) -> VoteKind {
        match self {
            VoteKind::Like => VoteKind::Dislike,
            VoteKind::Dislike => VoteKind::Like,
        }
    }

    /// Past tense for user-facing messages ("already liked")
    pub fn past_tense(&self) -> &'static str {
        match self {
            VoteKind::Like => "liked",
            VoteKind::Dislike => "disliked",
        }
    }

    /// The ledger set this vote occupies
    pub fn ledger_set(&self) -> LedgerSet {
        match self {
            VoteKind::Like => LedgerSet::Liked,
            VoteKind::Dislike => LedgerSet::Disliked,
        }
    }
}

/// Per-actor membership sets in the engagement ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerSet {
    Liked,
    Disliked,
    Saved,
}

impl LedgerSet {
    /// Buyer document field holding this set for the given votable kind
    pub fn field(&self, kind: VotableKind) -> &'static str {
        match (self, kind) {
            (LedgerSet::Liked, VotableKind::Comment) => "liked_comments",
            (LedgerSet::Disliked, VotableKind::Comment) => "disliked_comments",
            (LedgerSet::Saved, VotableKind::Comment) => "saved_comments",
            (LedgerSet::Liked, VotableKind::Review) => "liked_reviews",
            (LedgerSet::Disliked, VotableKind::Review) => "disliked_reviews",
            (LedgerSet::Saved, VotableKind::Review) => "saved_reviews",
        }
    }
}

/// Where a new reply attaches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    Review(String),
    Comment(String),
}

impl ReplyTarget {
    pub fn kind(&self) -> VotableKind {
        match self {
            ReplyTarget::Review(_) => VotableKind::Review,
            ReplyTarget::Comment(_) => VotableKind::Comment,
        }
    }
}

/// Input for creating a comment node
#[derive(Debug, Clone)]
pub struct NewComment {
    pub author_id: String,
    pub author_name: String,
    pub text: String,
}

/// Storage-agnostic view of a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub posted_at: DateTime<Utc>,
    pub likes: i64,
    pub dislikes: i64,
    pub text: String,
    pub replies: Vec<String>,
}

/// Storage backend for the engagement engine
#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Whether a votable currently exists (soft-deleted counts as absent)
    async fn votable_exists(&self, kind: VotableKind, id: &str) -> Result<bool>;

    async fn fetch_comment(&self, id: &str) -> Result<Option<CommentNode>>;

    async fn insert_comment(&self, new: NewComment) -> Result<CommentNode>;

    /// Replace a comment's text; false if the comment is absent
    async fn update_comment_text(&self, id: &str, text: &str) -> Result<bool>;

    /// Remove a comment node; false if already absent. Does not touch the
    /// parent's reply list or the node's own children.
    async fn delete_comment(&self, id: &str) -> Result<bool>;

    /// Append a comment id to the target's reply list; false if the target
    /// is absent
    async fn append_reply(&self, target: &ReplyTarget, comment_id: &str) -> Result<bool>;

    /// Guarded set insert. Returns true iff membership changed; a false
    /// return means the id was already present when the write landed.
    async fn ledger_insert(
        &self,
        actor_id: &str,
        set: LedgerSet,
        kind: VotableKind,
        id: &str,
    ) -> Result<bool>;

    /// Guarded set remove. Returns true iff membership changed.
    async fn ledger_remove(
        &self,
        actor_id: &str,
        set: LedgerSet,
        kind: VotableKind,
        id: &str,
    ) -> Result<bool>;

    /// Apply a counter delta as a single storage-side increment; false if
    /// the votable is absent
    async fn apply_counter_delta(
        &self,
        kind: VotableKind,
        id: &str,
        delta: CounterDelta,
    ) -> Result<bool>;
}
