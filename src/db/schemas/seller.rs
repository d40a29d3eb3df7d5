//! Seller document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for sellers
pub const SELLER_COLLECTION: &str = "sellers";

/// Seller document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SellerDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Full display name
    pub name: String,

    /// Unique storefront name
    pub seller_name: String,

    /// Unique account email
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Optional storefront description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,

    /// Optional profile image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_img: Option<String>,
}

impl SellerDoc {
    pub fn new(
        name: String,
        seller_name: String,
        email: String,
        password_hash: String,
        about: Option<String>,
        profile_img: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            seller_name,
            email,
            password_hash,
            about,
            profile_img,
        }
    }
}

impl IntoIndexes for SellerDoc {
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
                doc! { "seller_name": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("seller_name_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for SellerDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
