//! Comment document schema
//!
//! Comments form the thread graph: a comment owns an ordered list of reply
//! ids, appended at reply creation and never rewritten. Deleting a comment
//! does not cascade; dangling reply ids resolve to absent on fetch.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for comments
pub const COMMENT_COLLECTION: &str = "comments";

/// Comment document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CommentDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Author id snapshot, captured at creation and never re-resolved
    pub author_id: String,

    /// Author display name snapshot
    pub author_name: String,

    /// Creation time
    pub posted_at: DateTime,

    /// Aggregate like count; must equal the number of buyers whose
    /// liked_comments set contains this id between completed operations
    #[serde(default)]
    pub likes: i64,

    /// Aggregate dislike count, same invariant as likes
    #[serde(default)]
    pub dislikes: i64,

    /// Free text body
    pub text: String,

    /// Ordered reply comment ids
    #[serde(default)]
    pub replies: Vec<String>,
}

impl CommentDoc {
    pub fn new(author_id: String, author_name: String, text: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            author_id,
            author_name,
            posted_at: DateTime::now(),
            likes: 0,
            dislikes: 0,
            text,
            replies: Vec::new(),
        }
    }
}

impl Default for CommentDoc {
    fn default() -> Self {
        Self::new(String::new(), String::new(), String::new())
    }
}

impl IntoIndexes for CommentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "author_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("author_id_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for CommentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
