//! Buyer document schema
//!
//! Stores buyer credentials plus the engagement ledger: per-actor sets of
//! liked/disliked/saved comment and review ids, the wishlist, and the cart.
//! The vote sets are the source of truth the like/dislike counters must
//! agree with; all mutations go through guarded updates.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for buyers
pub const BUYER_COLLECTION: &str = "buyers";

/// A product in the cart, with the time it was added
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CartEntry {
    pub product_id: String,
    pub added_at: DateTime,
}

/// Buyer document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BuyerDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Full display name
    pub name: String,

    /// Unique account name
    pub user_name: String,

    /// Unique account email
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Optional profile image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_img: Option<String>,

    // === Engagement ledger ===
    #[serde(default)]
    pub liked_comments: Vec<String>,
    #[serde(default)]
    pub disliked_comments: Vec<String>,
    #[serde(default)]
    pub saved_comments: Vec<String>,
    #[serde(default)]
    pub liked_reviews: Vec<String>,
    #[serde(default)]
    pub disliked_reviews: Vec<String>,
    #[serde(default)]
    pub saved_reviews: Vec<String>,

    // === Shopping lists ===
    #[serde(default)]
    pub cart: Vec<CartEntry>,
    #[serde(default)]
    pub wishlist: Vec<String>,
}

impl BuyerDoc {
    /// Create a new buyer document with empty engagement sets
    pub fn new(
        name: String,
        user_name: String,
        email: String,
        password_hash: String,
        profile_img: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            user_name,
            email,
            password_hash,
            profile_img,
            ..Default::default()
        }
    }
}

impl IntoIndexes for BuyerDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_name_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for BuyerDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
