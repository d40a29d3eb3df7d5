//! Product document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for products
pub const PRODUCT_COLLECTION: &str = "products";

/// Product document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProductDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    pub product_name: String,

    pub product_desc: String,

    pub product_price: f64,

    pub stock: i64,

    pub product_category: String,

    #[serde(default)]
    pub product_images: Vec<String>,

    /// Arithmetic mean of associated reviews' ratings. Recomputed on every
    /// new review only; review edits and deletes leave it stale.
    #[serde(default)]
    pub avg_rating: f64,

    /// Ordered review ids, insertion order = chronological
    #[serde(default)]
    pub reviews: Vec<String>,

    /// Owning seller id
    pub seller_id: String,
}

impl IntoIndexes for ProductDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "seller_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("seller_id_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "product_category": 1 },
                Some(
                    IndexOptions::builder()
                        .name("category_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ProductDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
