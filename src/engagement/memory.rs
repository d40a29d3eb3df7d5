//! In-memory engagement store
//!
//! Backs dev mode (no MongoDB) and the engine's tests. Guarded semantics
//! match the MongoDB store: each ledger mutation holds the shard lock for
//! the duration of the membership change, so the changed/unchanged report
//! is atomic.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::engagement::reconciler::CounterDelta;
use crate::engagement::store::{
    CommentNode, EngagementStore, LedgerSet, NewComment, ReplyTarget, VotableKind,
};
use crate::types::Result;

/// Minimal review state needed for engagement (counters and thread links)
#[derive(Debug, Clone, Default)]
pub struct ReviewStub {
    pub likes: i64,
    pub dislikes: i64,
    pub replies: Vec<String>,
}

#[derive(Default)]
pub struct MemoryEngagementStore {
    // Keyed by (actor id, buyer ledger field)
    ledgers: DashMap<(String, &'static str), HashSet<String>>,
    comments: DashMap<String, CommentNode>,
    reviews: DashMap<String, ReviewStub>,
}

impl MemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a review so it can be voted on and replied to
    pub fn insert_review(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.reviews.insert(id.clone(), ReviewStub::default());
        id
    }

    pub fn review_counters(&self, id: &str) -> Option<(i64, i64)> {
        self.reviews.get(id).map(|r| (r.likes, r.dislikes))
    }

    pub fn review_replies(&self, id: &str) -> Option<Vec<String>> {
        self.reviews.get(id).map(|r| r.replies.clone())
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

#[async_trait]
impl EngagementStore for MemoryEngagementStore {
    async fn votable_exists(&self, kind: VotableKind, id: &str) -> Result<bool> {
        Ok(match kind {
            VotableKind::Comment => self.comments.contains_key(id),
            VotableKind::Review => self.reviews.contains_key(id),
        })
    }

    async fn fetch_comment(&self, id: &str) -> Result<Option<CommentNode>> {
        Ok(self.comments.get(id).map(|c| c.value().clone()))
    }

    async fn insert_comment(&self, new: NewComment) -> Result<CommentNode> {
        let node = CommentNode {
            id: Uuid::new_v4().to_string(),
            author_id: new.author_id,
            author_name: new.author_name,
            posted_at: Utc::now(),
            likes: 0,
            dislikes: 0,
            text: new.text,
            replies: Vec::new(),
        };
        self.comments.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    async fn update_comment_text(&self, id: &str, text: &str) -> Result<bool> {
        match self.comments.get_mut(id) {
            Some(mut c) => {
                c.text = text.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_comment(&self, id: &str) -> Result<bool> {
        Ok(self.comments.remove(id).is_some())
    }

    async fn append_reply(&self, target: &ReplyTarget, comment_id: &str) -> Result<bool> {
        match target {
            ReplyTarget::Review(id) => match self.reviews.get_mut(id.as_str()) {
                Some(mut r) => {
                    r.replies.push(comment_id.to_string());
                    Ok(true)
                }
                None => Ok(false),
            },
            ReplyTarget::Comment(id) => match self.comments.get_mut(id.as_str()) {
                Some(mut c) => {
                    c.replies.push(comment_id.to_string());
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }

    async fn ledger_insert(
        &self,
        actor_id: &str,
        set: LedgerSet,
        kind: VotableKind,
        id: &str,
    ) -> Result<bool> {
        let key = (actor_id.to_string(), set.field(kind));
        Ok(self.ledgers.entry(key).or_default().insert(id.to_string()))
    }

    async fn ledger_remove(
        &self,
        actor_id: &str,
        set: LedgerSet,
        kind: VotableKind,
        id: &str,
    ) -> Result<bool> {
        let key = (actor_id.to_string(), set.field(kind));
        Ok(self
            .ledgers
            .get_mut(&key)
            .map(|mut s| s.remove(id))
            .unwrap_or(false))
    }

    async fn apply_counter_delta(
        &self,
        kind: VotableKind,
        id: &str,
        delta: CounterDelta,
    ) -> Result<bool> {
        if delta.is_zero() {
            return Ok(true);
        }
        match kind {
            VotableKind::Comment => match self.comments.get_mut(id) {
                Some(mut c) => {
                    c.likes += delta.likes;
                    c.dislikes += delta.dislikes;
                    Ok(true)
                }
                None => Ok(false),
            },
            VotableKind::Review => match self.reviews.get_mut(id) {
                Some(mut r) => {
                    r.likes += delta.likes;
                    r.dislikes += delta.dislikes;
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }
}
