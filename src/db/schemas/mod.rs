//! Database schemas for Bazaar
//!
//! Defines MongoDB document structures for buyers, sellers, products,
//! reviews and comments.

mod buyer;
mod comment;
mod metadata;
mod product;
mod review;
mod seller;

pub use buyer::{BuyerDoc, CartEntry, BUYER_COLLECTION};
pub use comment::{CommentDoc, COMMENT_COLLECTION};
pub use metadata::Metadata;
pub use product::{ProductDoc, PRODUCT_COLLECTION};
pub use review::{ReviewDoc, REVIEW_COLLECTION};
pub use seller::{SellerDoc, SELLER_COLLECTION};
