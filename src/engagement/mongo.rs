//! MongoDB engagement store
//!
//! Ledger mutations run as guarded `update_one` calls: the membership
//! precondition lives in the filter, so a matched count of zero means the
//! precondition did not hold at the moment the write landed. Two concurrent
//! duplicate likes cannot both match.

use bson::{doc, oid::ObjectId, DateTime, Document};

use crate::db::mongo::MongoCollection;
use crate::db::schemas::{BuyerDoc, CommentDoc, ReviewDoc};
use crate::engagement::reconciler::CounterDelta;
use crate::engagement::store::{
    CommentNode, EngagementStore, LedgerSet, NewComment, ReplyTarget, VotableKind,
};
use crate::types::{ApiError, Result};

use async_trait::async_trait;

pub struct MongoEngagementStore {
    buyers: MongoCollection<BuyerDoc>,
    comments: MongoCollection<CommentDoc>,
    reviews: MongoCollection<ReviewDoc>,
}

impl MongoEngagementStore {
    pub fn new(
        buyers: MongoCollection<BuyerDoc>,
        comments: MongoCollection<CommentDoc>,
        reviews: MongoCollection<ReviewDoc>,
    ) -> Self {
        Self {
            buyers,
            comments,
            reviews,
        }
    }
}

fn parse_oid(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| ApiError::Validation(format!("Invalid id: {}", id)))
}

fn node_from_doc(doc: CommentDoc) -> CommentNode {
    CommentNode {
        id: doc._id.map(|o| o.to_hex()).unwrap_or_default(),
        author_id: doc.author_id,
        author_name: doc.author_name,
        posted_at: doc.posted_at.to_chrono(),
        likes: doc.likes,
        dislikes: doc.dislikes,
        text: doc.text,
        replies: doc.replies,
    }
}

#[async_trait]
impl EngagementStore for MongoEngagementStore {
    async fn votable_exists(&self, kind: VotableKind, id: &str) -> Result<bool> {
        let oid = parse_oid(id)?;
        let filter = doc! { "_id": oid };
        Ok(match kind {
            VotableKind::Comment => self.comments.find_one(filter).await?.is_some(),
            VotableKind::Review => self.reviews.find_one(filter).await?.is_some(),
        })
    }

    async fn fetch_comment(&self, id: &str) -> Result<Option<CommentNode>> {
        let oid = parse_oid(id)?;
        Ok(self
            .comments
            .find_one(doc! { "_id": oid })
            .await?
            .map(node_from_doc))
    }

    async fn insert_comment(&self, new: NewComment) -> Result<CommentNode> {
        let doc = CommentDoc::new(new.author_id, new.author_name, new.text);
        let posted_at = doc.posted_at;
        let author_id = doc.author_id.clone();
        let author_name = doc.author_name.clone();
        let text = doc.text.clone();
        let oid = self.comments.insert_one(doc).await?;

        Ok(CommentNode {
            id: oid.to_hex(),
            author_id,
            author_name,
            posted_at: posted_at.to_chrono(),
            likes: 0,
            dislikes: 0,
            text,
            replies: Vec::new(),
        })
    }

    async fn update_comment_text(&self, id: &str, text: &str) -> Result<bool> {
        let oid = parse_oid(id)?;
        let result = self
            .comments
            .update_one(
                doc! { "_id": oid },
                doc! { "$set": { "text": text, "metadata.updated_at": DateTime::now() } },
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_comment(&self, id: &str) -> Result<bool> {
        let oid = parse_oid(id)?;
        let result = self.comments.soft_delete(doc! { "_id": oid }).await?;
        Ok(result.matched_count == 1)
    }

    async fn append_reply(&self, target: &ReplyTarget, comment_id: &str) -> Result<bool> {
        let update = doc! {
            "$push": { "replies": comment_id },
            "$set": { "metadata.updated_at": DateTime::now() },
        };
        let result = match target {
            ReplyTarget::Review(id) => {
                let oid = parse_oid(id)?;
                self.reviews.update_one(doc! { "_id": oid }, update).await?
            }
            ReplyTarget::Comment(id) => {
                let oid = parse_oid(id)?;
                self.comments.update_one(doc! { "_id": oid }, update).await?
            }
        };
        Ok(result.matched_count == 1)
    }

    async fn ledger_insert(
        &self,
        actor_id: &str,
        set: LedgerSet,
        kind: VotableKind,
        id: &str,
    ) -> Result<bool> {
        let actor_oid = parse_oid(actor_id)?;
        let field = set.field(kind);

        // Absence precondition in the filter makes the insert a CAS
        let filter = doc! { "_id": actor_oid, field: { "$ne": id } };
        let update = doc! {
            "$addToSet": { field: id },
            "$set": { "metadata.updated_at": DateTime::now() },
        };
        let result = self.buyers.update_one(filter, update).await?;
        if result.matched_count == 1 {
            return Ok(true);
        }

        // Distinguish "already present" from "no such buyer"
        if self
            .buyers
            .find_one(doc! { "_id": actor_oid })
            .await?
            .is_none()
        {
            return Err(ApiError::NotFound("User not found".into()));
        }
        Ok(false)
    }

    async fn ledger_remove(
        &self,
        actor_id: &str,
        set: LedgerSet,
        kind: VotableKind,
        id: &str,
    ) -> Result<bool> {
        let actor_oid = parse_oid(actor_id)?;
        let field = set.field(kind);

        let filter = doc! { "_id": actor_oid, field: id };
        let update = doc! {
            "$pull": { field: id },
            "$set": { "metadata.updated_at": DateTime::now() },
        };
        let result = self.buyers.update_one(filter, update).await?;
        Ok(result.matched_count == 1)
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
        let oid = parse_oid(id)?;

        let mut inc = Document::new();
        if delta.likes != 0 {
            inc.insert("likes", delta.likes);
        }
        if delta.dislikes != 0 {
            inc.insert("dislikes", delta.dislikes);
        }
        let update = doc! { "$inc": inc };

        let result = match kind {
            VotableKind::Comment => self.comments.update_one(doc! { "_id": oid }, update).await?,
            VotableKind::Review => self.reviews.update_one(doc! { "_id": oid }, update).await?,
        };
        Ok(result.matched_count == 1)
    }
}
