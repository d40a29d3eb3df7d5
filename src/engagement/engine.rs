//! Engagement engine
//!
//! Drives the social state machine over an `EngagementStore`: mutually
//! exclusive like/dislike voting with counter reconciliation, save/unsave
//! bookmarking, and reply threading. Writes are ordered ledger first, then
//! counter, with a compensating rollback if the counter write fails.

use std::sync::Arc;

use tracing::warn;

use crate::engagement::reconciler::CounterDelta;
use crate::engagement::store::{
    CommentNode, EngagementStore, LedgerSet, NewComment, ReplyTarget, VotableKind, VoteKind,
};
use crate::types::{ApiError, Result};

#[derive(Clone)]
pub struct Engagement {
    store: Arc<dyn EngagementStore>,
}

impl Engagement {
    pub fn new(store: Arc<dyn EngagementStore>) -> Self {
        Self { store }
    }

    fn not_found(kind: VotableKind) -> ApiError {
        ApiError::NotFound(format!("{} not found", kind.noun_capitalized()))
    }

    /// Cast a like or dislike. The desired set gains the id, the opposite
    /// set atomically drops it if held, and both counters adjust in one
    /// storage-side increment.
    pub async fn set_vote(
        &self,
        actor_id: &str,
        kind: VotableKind,
        id: &str,
        vote: VoteKind,
    ) -> Result<()> {
        if !self.store.votable_exists(kind, id).await? {
            return Err(Self::not_found(kind));
        }

        let desired = vote.ledger_set();
        if !self.store.ledger_insert(actor_id, desired, kind, id).await? {
            return Err(ApiError::Conflict(format!(
                "You have already {} this {}",
                vote.past_tense(),
                kind.noun()
            )));
        }

        let opposite = vote.opposite().ledger_set();
        let was_opposite = match self.store.ledger_remove(actor_id, opposite, kind, id).await {
            Ok(changed) => changed,
            Err(e) => {
                self.rollback_vote(actor_id, kind, id, desired, false, opposite)
                    .await?;
                return Err(e);
            }
        };

        let delta = CounterDelta::engage(vote, was_opposite);
        match self.store.apply_counter_delta(kind, id, delta).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.rollback_vote(actor_id, kind, id, desired, was_opposite, opposite)
                    .await?;
                Err(Self::not_found(kind))
            }
            Err(e) => {
                self.rollback_vote(actor_id, kind, id, desired, was_opposite, opposite)
                    .await?;
                Err(e)
            }
        }
    }

    /// Retract a held like or dislike; the opposite set is untouched
    pub async fn clear_vote(
        &self,
        actor_id: &str,
        kind: VotableKind,
        id: &str,
        vote: VoteKind,
    ) -> Result<()> {
        if !self.store.votable_exists(kind, id).await? {
            return Err(Self::not_found(kind));
        }

        let set = vote.ledger_set();
        if !self.store.ledger_remove(actor_id, set, kind, id).await? {
            return Err(ApiError::Validation(format!(
                "You have not {} this {}",
                vote.past_tense(),
                kind.noun()
            )));
        }

        let delta = CounterDelta::retract(vote);
        match self.store.apply_counter_delta(kind, id, delta).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if let Err(re) = self.store.ledger_insert(actor_id, set, kind, id).await {
                    warn!(%id, "vote retraction rollback failed: {}", re);
                    return Err(ApiError::PartialFailure(format!(
                        "ledger removed but counter update and rollback both failed: {}",
                        e
                    )));
                }
                Err(e)
            }
        }
    }

    /// Undo ledger mutations after a failed counter write
    async fn rollback_vote(
        &self,
        actor_id: &str,
        kind: VotableKind,
        id: &str,
        desired: LedgerSet,
        was_opposite: bool,
        opposite: LedgerSet,
    ) -> Result<()> {
        let mut failed = false;

        if let Err(e) = self.store.ledger_remove(actor_id, desired, kind, id).await {
            warn!(%id, "vote rollback failed to remove desired entry: {}", e);
            failed = true;
        }
        if was_opposite {
            if let Err(e) = self.store.ledger_insert(actor_id, opposite, kind, id).await {
                warn!(%id, "vote rollback failed to restore opposite entry: {}", e);
                failed = true;
            }
        }

        if failed {
            return Err(ApiError::PartialFailure(
                "ledger updated but counter update and rollback both failed".into(),
            ));
        }
        Ok(())
    }

    /// Bookmark a comment or review
    pub async fn save(&self, actor_id: &str, kind: VotableKind, id: &str) -> Result<()> {
        if !self.store.votable_exists(kind, id).await? {
            return Err(Self::not_found(kind));
        }
        if !self
            .store
            .ledger_insert(actor_id, LedgerSet::Saved, kind, id)
            .await?
        {
            return Err(ApiError::Conflict(format!(
                "You have already saved this {}",
                kind.noun()
            )));
        }
        Ok(())
    }

    /// Remove a bookmark
    pub async fn unsave(&self, actor_id: &str, kind: VotableKind, id: &str) -> Result<()> {
        if !self.store.votable_exists(kind, id).await? {
            return Err(Self::not_found(kind));
        }
        if !self
            .store
            .ledger_remove(actor_id, LedgerSet::Saved, kind, id)
            .await?
        {
            return Err(ApiError::NotFound(format!(
                "You have not saved this {}",
                kind.noun()
            )));
        }
        Ok(())
    }

    /// Post a reply under exactly one of a review or a parent comment.
    ///
    /// The comment node is persisted before the target link is checked, so a
    /// reply to a missing target leaves an orphaned comment behind. The
    /// orphan stays fetchable by id.
    pub async fn post_reply(
        &self,
        author_id: &str,
        author_name: &str,
        text: &str,
        review_id: Option<String>,
        parent_comment_id: Option<String>,
    ) -> Result<CommentNode> {
        let target = match (review_id, parent_comment_id) {
            (Some(r), None) => ReplyTarget::Review(r),
            (None, Some(c)) => ReplyTarget::Comment(c),
            _ => {
                return Err(ApiError::Validation(
                    "Provide exactly one of reviewId or parentCommentId".into(),
                ))
            }
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Validation("Comment text cannot be empty".into()));
        }

        let node = self
            .store
            .insert_comment(NewComment {
                author_id: author_id.to_string(),
                author_name: author_name.to_string(),
                text: trimmed.to_string(),
            })
            .await?;

        if !self.store.append_reply(&target, &node.id).await? {
            warn!(comment_id = %node.id, "reply target missing, comment left unlinked");
            return Err(Self::not_found(target.kind()));
        }

        Ok(node)
    }

    pub async fn get_comment(&self, id: &str) -> Result<CommentNode> {
        self.store
            .fetch_comment(id)
            .await?
            .ok_or_else(|| Self::not_found(VotableKind::Comment))
    }

    /// Resolve a comment's reply ids to nodes. Dangling ids resolve to
    /// absent and are skipped, never an error.
    pub async fn get_replies(&self, id: &str) -> Result<Vec<CommentNode>> {
        let parent = self.get_comment(id).await?;
        let mut nodes = Vec::with_capacity(parent.replies.len());
        for reply_id in &parent.replies {
            if let Some(node) = self.store.fetch_comment(reply_id).await? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Replace a comment's text; author only
    pub async fn edit_comment(&self, actor_id: &str, id: &str, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Validation("Comment text cannot be empty".into()));
        }

        let node = self.get_comment(id).await?;
        if node.author_id != actor_id {
            return Err(ApiError::Forbidden(
                "You can only edit your own comments".into(),
            ));
        }

        if !self.store.update_comment_text(id, trimmed).await? {
            return Err(Self::not_found(VotableKind::Comment));
        }
        Ok(())
    }

    /// Remove a comment node; author only. The parent's reply reference and
    /// the node's own children are left in place.
    pub async fn delete_comment(&self, actor_id: &str, id: &str) -> Result<()> {
        let node = self.get_comment(id).await?;
        if node.author_id != actor_id {
            return Err(ApiError::Forbidden(
                "You can only delete your own comments".into(),
            ));
        }

        if !self.store.delete_comment(id).await? {
            return Err(Self::not_found(VotableKind::Comment));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::memory::MemoryEngagementStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    const ALICE: &str = "buyer-alice";
    const BOB: &str = "buyer-bob";

    fn engine_with_store() -> (Engagement, Arc<MemoryEngagementStore>) {
        let store = Arc::new(MemoryEngagementStore::new());
        let dyn_store: Arc<dyn EngagementStore> = store.clone();
        (Engagement::new(dyn_store), store)
    }

    async fn seed_comment(engine: &Engagement, store: &MemoryEngagementStore) -> String {
        let review_id = store.insert_review();
        let node = engine
            .post_reply(ALICE, "Alice", "first!", Some(review_id), None)
            .await
            .unwrap();
        node.id
    }

    #[tokio::test]
    async fn test_reply_links_to_review() {
        let (engine, store) = engine_with_store();
        let review_id = store.insert_review();

        let node = engine
            .post_reply(ALICE, "Alice", "great product", Some(review_id.clone()), None)
            .await
            .unwrap();

        assert_eq!(store.review_replies(&review_id), Some(vec![node.id]));
    }

    #[tokio::test]
    async fn test_fresh_like_increments_counter() {
        let (engine, store) = engine_with_store();
        let comment_id = seed_comment(&engine, &store).await;

        engine
            .set_vote(BOB, VotableKind::Comment, &comment_id, VoteKind::Like)
            .await
            .unwrap();

        let node = engine.get_comment(&comment_id).await.unwrap();
        assert_eq!((node.likes, node.dislikes), (1, 0));
    }

    #[tokio::test]
    async fn test_duplicate_like_is_conflict() {
        let (engine, store) = engine_with_store();
        let comment_id = seed_comment(&engine, &store).await;

        engine
            .set_vote(BOB, VotableKind::Comment, &comment_id, VoteKind::Like)
            .await
            .unwrap();
        let err = engine
            .set_vote(BOB, VotableKind::Comment, &comment_id, VoteKind::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // counter unchanged by the rejected duplicate
        let node = engine.get_comment(&comment_id).await.unwrap();
        assert_eq!(node.likes, 1);
    }

    #[tokio::test]
    async fn test_vote_switch_nets_both_counters() {
        let (engine, store) = engine_with_store();
        let comment_id = seed_comment(&engine, &store).await;

        engine
            .set_vote(BOB, VotableKind::Comment, &comment_id, VoteKind::Dislike)
            .await
            .unwrap();
        engine
            .set_vote(BOB, VotableKind::Comment, &comment_id, VoteKind::Like)
            .await
            .unwrap();

        let node = engine.get_comment(&comment_id).await.unwrap();
        assert_eq!((node.likes, node.dislikes), (1, 0));

        // the dislike is gone from the ledger, so retracting it is an error
        let err = engine
            .clear_vote(BOB, VotableKind::Comment, &comment_id, VoteKind::Dislike)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unlike_when_not_liked_is_bad_request() {
        let (engine, store) = engine_with_store();
        let comment_id = seed_comment(&engine, &store).await;

        let err = engine
            .clear_vote(BOB, VotableKind::Comment, &comment_id, VoteKind::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let node = engine.get_comment(&comment_id).await.unwrap();
        assert_eq!((node.likes, node.dislikes), (0, 0));
    }

    #[tokio::test]
    async fn test_vote_on_missing_target_is_not_found() {
        let (engine, _store) = engine_with_store();
        let err = engine
            .set_vote(BOB, VotableKind::Comment, "no-such-id", VoteKind::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_save_unsave_cycle() {
        let (engine, store) = engine_with_store();
        let comment_id = seed_comment(&engine, &store).await;

        engine
            .save(BOB, VotableKind::Comment, &comment_id)
            .await
            .unwrap();

        let err = engine
            .save(BOB, VotableKind::Comment, &comment_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        engine
            .unsave(BOB, VotableKind::Comment, &comment_id)
            .await
            .unwrap();

        let err = engine
            .unsave(BOB, VotableKind::Comment, &comment_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // save is usable again after the cycle
        engine
            .save(BOB, VotableKind::Comment, &comment_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reply_requires_exactly_one_target() {
        let (engine, store) = engine_with_store();
        let review_id = store.insert_review();

        let err = engine
            .post_reply(
                ALICE,
                "Alice",
                "hi",
                Some(review_id.clone()),
                Some("some-comment".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = engine
            .post_reply(ALICE, "Alice", "hi", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        assert_eq!(store.comment_count(), 0);
    }

    #[tokio::test]
    async fn test_reply_to_missing_parent_leaves_orphan() {
        let (engine, store) = engine_with_store();

        let err = engine
            .post_reply(ALICE, "Alice", "orphaned", None, Some("missing-parent".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // the node was persisted before the link check
        assert_eq!(store.comment_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_reply_text_rejected() {
        let (engine, store) = engine_with_store();
        let review_id = store.insert_review();

        let err = engine
            .post_reply(ALICE, "Alice", "   ", Some(review_id), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(store.comment_count(), 0);
    }

    #[tokio::test]
    async fn test_dangling_reply_resolves_absent() {
        let (engine, store) = engine_with_store();
        let parent_id = seed_comment(&engine, &store).await;

        let child = engine
            .post_reply(BOB, "Bob", "me too", None, Some(parent_id.clone()))
            .await
            .unwrap();

        engine.delete_comment(BOB, &child.id).await.unwrap();

        // the parent still references the deleted child
        let parent = engine.get_comment(&parent_id).await.unwrap();
        assert_eq!(parent.replies, vec![child.id.clone()]);

        // the child itself resolves to absent
        let err = engine.get_comment(&child.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // traversal skips the dangling id without erroring
        let resolved = engine.get_replies(&parent_id).await.unwrap();
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_two_actor_counter_walk() {
        let (engine, store) = engine_with_store();
        let review_id = store.insert_review();

        engine
            .set_vote(ALICE, VotableKind::Review, &review_id, VoteKind::Like)
            .await
            .unwrap();
        assert_eq!(store.review_counters(&review_id), Some((1, 0)));

        engine
            .set_vote(BOB, VotableKind::Review, &review_id, VoteKind::Dislike)
            .await
            .unwrap();
        assert_eq!(store.review_counters(&review_id), Some((1, 1)));

        engine
            .clear_vote(ALICE, VotableKind::Review, &review_id, VoteKind::Like)
            .await
            .unwrap();
        assert_eq!(store.review_counters(&review_id), Some((0, 1)));

        engine
            .clear_vote(BOB, VotableKind::Review, &review_id, VoteKind::Dislike)
            .await
            .unwrap();
        assert_eq!(store.review_counters(&review_id), Some((0, 0)));
    }

    #[tokio::test]
    async fn test_edit_and_delete_are_author_only() {
        let (engine, store) = engine_with_store();
        let comment_id = seed_comment(&engine, &store).await;

        let err = engine
            .edit_comment(BOB, &comment_id, "hijacked")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = engine.delete_comment(BOB, &comment_id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        engine
            .edit_comment(ALICE, &comment_id, "edited")
            .await
            .unwrap();
        let node = engine.get_comment(&comment_id).await.unwrap();
        assert_eq!(node.text, "edited");

        engine.delete_comment(ALICE, &comment_id).await.unwrap();
    }

    /// Store wrapper that can be told to fail counter writes or ledger
    /// removals, for exercising the rollback paths.
    struct FlakyStore {
        inner: MemoryEngagementStore,
        fail_counters: AtomicBool,
        fail_removes: AtomicBool,
    }

    #[async_trait::async_trait]
    impl EngagementStore for FlakyStore {
        async fn votable_exists(&self, kind: VotableKind, id: &str) -> Result<bool> {
            self.inner.votable_exists(kind, id).await
        }
        async fn fetch_comment(&self, id: &str) -> Result<Option<CommentNode>> {
            self.inner.fetch_comment(id).await
        }
        async fn insert_comment(&self, new: NewComment) -> Result<CommentNode> {
            self.inner.insert_comment(new).await
        }
        async fn update_comment_text(&self, id: &str, text: &str) -> Result<bool> {
            self.inner.update_comment_text(id, text).await
        }
        async fn delete_comment(&self, id: &str) -> Result<bool> {
            self.inner.delete_comment(id).await
        }
        async fn append_reply(&self, target: &ReplyTarget, comment_id: &str) -> Result<bool> {
            self.inner.append_reply(target, comment_id).await
        }
        async fn ledger_insert(
            &self,
            actor_id: &str,
            set: LedgerSet,
            kind: VotableKind,
            id: &str,
        ) -> Result<bool> {
            self.inner.ledger_insert(actor_id, set, kind, id).await
        }
        async fn ledger_remove(
            &self,
            actor_id: &str,
            set: LedgerSet,
            kind: VotableKind,
            id: &str,
        ) -> Result<bool> {
            if self.fail_removes.load(Ordering::SeqCst) {
                return Err(ApiError::Database("injected remove failure".into()));
            }
            self.inner.ledger_remove(actor_id, set, kind, id).await
        }
        async fn apply_counter_delta(
            &self,
            kind: VotableKind,
            id: &str,
            delta: CounterDelta,
        ) -> Result<bool> {
            if self.fail_counters.load(Ordering::SeqCst) {
                return Err(ApiError::Database("injected counter failure".into()));
            }
            self.inner.apply_counter_delta(kind, id, delta).await
        }
    }

    #[tokio::test]
    async fn test_failed_counter_write_rolls_back_ledger() {
        let flaky = Arc::new(FlakyStore {
            inner: MemoryEngagementStore::new(),
            fail_counters: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
        });
        let review_id = flaky.inner.insert_review();
        let dyn_store: Arc<dyn EngagementStore> = flaky.clone();
        let engine = Engagement::new(dyn_store);

        flaky.fail_counters.store(true, Ordering::SeqCst);
        let err = engine
            .set_vote(BOB, VotableKind::Review, &review_id, VoteKind::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Database(_)));

        // ledger was rolled back, so a retry is not a duplicate
        flaky.fail_counters.store(false, Ordering::SeqCst);
        engine
            .set_vote(BOB, VotableKind::Review, &review_id, VoteKind::Like)
            .await
            .unwrap();
        assert_eq!(flaky.inner.review_counters(&review_id), Some((1, 0)));
    }

    #[tokio::test]
    async fn test_failed_rollback_is_partial_failure() {
        let flaky = Arc::new(FlakyStore {
            inner: MemoryEngagementStore::new(),
            fail_counters: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
        });
        let review_id = flaky.inner.insert_review();
        let dyn_store: Arc<dyn EngagementStore> = flaky.clone();
        let engine = Engagement::new(dyn_store);

        // the opposite-set removal and the rollback removal both fail
        flaky.fail_removes.store(true, Ordering::SeqCst);
        let err = engine
            .set_vote(BOB, VotableKind::Review, &review_id, VoteKind::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PartialFailure(_)));
    }
}
