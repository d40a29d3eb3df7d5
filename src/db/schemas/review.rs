//! Review document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for reviews
pub const REVIEW_COLLECTION: &str = "reviews";

/// Review document stored in MongoDB
///
/// Reviews root the thread graph: replies to a review are comments whose ids
/// are appended to `replies`. Like comments, reviews carry vote counters
/// maintained by the engagement engine.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReviewDoc {
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

    /// Star rating, 1 through 5
    pub rating: i32,

    pub title: String,

    pub body: String,

    #[serde(default)]
    pub likes: i64,

    #[serde(default)]
    pub dislikes: i64,

    /// Ordered reply comment ids
    #[serde(default)]
    pub replies: Vec<String>,
}

impl ReviewDoc {
    pub fn new(
        author_id: String,
        author_name: String,
        rating: i32,
        title: String,
        body: String,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            author_id,
            author_name,
            posted_at: DateTime::now(),
            rating,
            title,
            body,
            likes: 0,
            dislikes: 0,
            replies: Vec::new(),
        }
    }
}

impl Default for ReviewDoc {
    fn default() -> Self {
        Self::new(String::new(), String::new(), 0, String::new(), String::new())
    }
}

impl IntoIndexes for ReviewDoc {
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

impl MutMetadata for ReviewDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
