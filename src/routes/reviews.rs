//! HTTP routes for reviews
//!
//! - POST   /review/:productId    - post a review, recomputes the product's
//!                                  average rating
//! - GET    /review/:id           - fetch one review
//! - PUT    /review/:reviewId     - edit own review (no rating recompute)
//! - DELETE /review/:reviewId     - delete own review (no rating recompute)
//! - GET    /review/:id/product   - reviews for a product
//! - GET    /review/:id/user      - reviews by an author
//! - POST/DELETE /review/{like,dislike,save}/:id - engagement actions
//!
//! The plural prefix /reviews/* is accepted as an alias.

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::{ProductDoc, ReviewDoc, PRODUCT_COLLECTION, REVIEW_COLLECTION};
use crate::engagement::{VotableKind, VoteKind};
use crate::routes::{
    authenticate, cors_preflight, data_response, engagement_save, engagement_vote, error_response,
    message_response, parse_json_body, parse_oid, path_segments, require_mongo, BoxBody,
};
use crate::server::AppState;
use crate::types::{ApiError, Result};

#[derive(Debug, Deserialize)]
pub struct PostReviewRequest {
    pub rating: i32,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct EditReviewRequest {
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub posted_at: String,
    pub rating: i32,
    pub title: String,
    pub body: String,
    pub likes: i64,
    pub dislikes: i64,
    pub replies: Vec<String>,
}

impl From<ReviewDoc> for ReviewResponse {
    fn from(doc: ReviewDoc) -> Self {
        Self {
            id: doc._id.map(|o| o.to_hex()).unwrap_or_default(),
            author_id: doc.author_id,
            author_name: doc.author_name,
            posted_at: doc.posted_at.to_chrono().to_rfc3339(),
            rating: doc.rating,
            title: doc.title,
            body: doc.body,
            likes: doc.likes,
            dislikes: doc.dislikes,
            replies: doc.replies,
        }
    }
}

pub async fn handle_review_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let segments = path_segments(&path);

    if segments.first() != Some(&"review") && segments.first() != Some(&"reviews") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let method = req.method().clone();
    let rest: Vec<String> = segments[1..].iter().map(|s| s.to_string()).collect();
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

    let response = match (&method, rest.as_slice()) {
        (&Method::POST, ["like", id]) => {
            engagement_vote(req, state, VotableKind::Review, id, VoteKind::Like, true).await
        }
        (&Method::DELETE, ["like", id]) => {
            engagement_vote(req, state, VotableKind::Review, id, VoteKind::Like, false).await
        }
        (&Method::POST, ["dislike", id]) => {
            engagement_vote(req, state, VotableKind::Review, id, VoteKind::Dislike, true).await
        }
        (&Method::DELETE, ["dislike", id]) => {
            engagement_vote(req, state, VotableKind::Review, id, VoteKind::Dislike, false).await
        }
        (&Method::POST, ["save", id]) => {
            engagement_save(req, state, VotableKind::Review, id, true).await
        }
        (&Method::DELETE, ["save", id]) => {
            engagement_save(req, state, VotableKind::Review, id, false).await
        }

        (&Method::POST, [product_id]) => handle_post_review(req, state, product_id).await,
        (&Method::GET, [id]) => handle_get_review(req, state, id).await,
        (&Method::PUT, [review_id]) => handle_edit_review(req, state, review_id).await,
        (&Method::DELETE, [review_id]) => handle_delete_review(req, state, review_id).await,
        (&Method::GET, [id, "product"]) => handle_product_reviews(req, state, id).await,
        (&Method::GET, [id, "user"]) => handle_user_reviews(req, state, id).await,

        _ => message_response(StatusCode::NOT_FOUND, "Review endpoint not found"),
    };

    Some(response)
}

/// Mean rating over the product's current reviews plus one new rating.
/// Dangling review ids contribute nothing.
async fn recompute_avg_rating(
    state: &AppState,
    product: &ProductDoc,
    new_rating: i32,
) -> Result<f64> {
    let mongo = require_mongo(state)?;
    let reviews = mongo
        .collection::<ReviewDoc>(REVIEW_COLLECTION)
        .await?;

    let oids: Vec<bson::oid::ObjectId> = product
        .reviews
        .iter()
        .filter_map(|id| bson::oid::ObjectId::parse_str(id).ok())
        .collect();

    let mut ratings: Vec<i32> = reviews
        .find_many(doc! { "_id": { "$in": oids } })
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();
    ratings.push(new_rating);

    let sum: i64 = ratings.iter().map(|r| *r as i64).sum();
    Ok(sum as f64 / ratings.len() as f64)
}

async fn handle_post_review(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    product_id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let body: PostReviewRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if !(1..=5).contains(&body.rating) {
        return error_response(&ApiError::Validation(
            "Rating must be between 1 and 5".into(),
        ));
    }
    if body.title.trim().is_empty() || body.body.trim().is_empty() {
        return error_response(&ApiError::Validation(
            "Review title and body cannot be empty".into(),
        ));
    }

    let result = post_review(&state, &claims.sub, &claims.name, product_id, body).await;
    match result {
        Ok(response) => data_response(
            StatusCode::CREATED,
            "Review posted",
            serde_json::to_value(&response).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}

async fn post_review(
    state: &AppState,
    author_id: &str,
    author_name: &str,
    product_id: &str,
    body: PostReviewRequest,
) -> Result<ReviewResponse> {
    let mongo = require_mongo(state)?;
    let products = mongo
        .collection::<ProductDoc>(PRODUCT_COLLECTION)
        .await?;
    let reviews = mongo
        .collection::<ReviewDoc>(REVIEW_COLLECTION)
        .await?;

    let product_oid = parse_oid(product_id)?;
    let product = products
        .find_one(doc! { "_id": product_oid })
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    let avg_rating = recompute_avg_rating(state, &product, body.rating).await?;

    let mut doc = ReviewDoc::new(
        author_id.to_string(),
        author_name.to_string(),
        body.rating,
        body.title.trim().to_string(),
        body.body.trim().to_string(),
    );
    let oid = reviews.insert_one(doc.clone()).await?;
    doc._id = Some(oid);

    // Second, non-atomic write: the review exists even if this link fails
    products
        .update_one(
            doc! { "_id": product_oid },
            doc! {
                "$push": { "reviews": oid.to_hex() },
                "$set": { "avg_rating": avg_rating, "metadata.updated_at": bson::DateTime::now() },
            },
        )
        .await?;

    Ok(ReviewResponse::from(doc))
}

async fn handle_get_review(
    _req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let result: Result<ReviewResponse> = async {
        let mongo = require_mongo(&state)?;
        let reviews = mongo
            .collection::<ReviewDoc>(REVIEW_COLLECTION)
            .await?;
        let oid = parse_oid(id)?;
        reviews
            .find_one(doc! { "_id": oid })
            .await?
            .map(ReviewResponse::from)
            .ok_or_else(|| ApiError::NotFound("Review not found".into()))
    }
    .await;

    match result {
        Ok(review) => data_response(
            StatusCode::OK,
            "Review found",
            serde_json::to_value(&review).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_edit_review(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    review_id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let body: EditReviewRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        if let Some(rating) = body.rating {
            if !(1..=5).contains(&rating) {
                return Err(ApiError::Validation("Rating must be between 1 and 5".into()));
            }
        }

        let mut set = doc! { "metadata.updated_at": bson::DateTime::now() };
        if let Some(rating) = body.rating {
            set.insert("rating", rating);
        }
        if let Some(title) = &body.title {
            if title.trim().is_empty() {
                return Err(ApiError::Validation("Review title cannot be empty".into()));
            }
            set.insert("title", title.trim());
        }
        if let Some(text) = &body.body {
            if text.trim().is_empty() {
                return Err(ApiError::Validation("Review body cannot be empty".into()));
            }
            set.insert("body", text.trim());
        }

        let mongo = require_mongo(&state)?;
        let reviews = mongo
            .collection::<ReviewDoc>(REVIEW_COLLECTION)
            .await?;
        let oid = parse_oid(review_id)?;

        let review = reviews
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;
        if review.author_id != claims.sub {
            return Err(ApiError::Forbidden("You can only edit your own reviews".into()));
        }

        // avg_rating is deliberately not recomputed here
        reviews
            .update_one(doc! { "_id": oid }, doc! { "$set": set })
            .await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Review updated"),
        Err(e) => error_response(&e),
    }
}

async fn handle_delete_review(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    review_id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let reviews = mongo
            .collection::<ReviewDoc>(REVIEW_COLLECTION)
            .await?;
        let oid = parse_oid(review_id)?;

        let review = reviews
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".into()))?;
        if review.author_id != claims.sub {
            return Err(ApiError::Forbidden(
                "You can only delete your own reviews".into(),
            ));
        }

        // The owning product keeps the dangling id and its stale avg_rating
        reviews.soft_delete(doc! { "_id": oid }).await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Review deleted"),
        Err(e) => error_response(&e),
    }
}

async fn handle_product_reviews(
    _req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    product_id: &str,
) -> Response<BoxBody> {
    let result: Result<Vec<ReviewResponse>> = async {
        let mongo = require_mongo(&state)?;
        let products = mongo
            .collection::<ProductDoc>(PRODUCT_COLLECTION)
            .await?;
        let reviews = mongo
            .collection::<ReviewDoc>(REVIEW_COLLECTION)
            .await?;

        let oid = parse_oid(product_id)?;
        let product = products
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

        // Dangling ids (deleted reviews) are dropped by the $in lookup
        let review_oids: Vec<bson::oid::ObjectId> = product
            .reviews
            .iter()
            .filter_map(|id| bson::oid::ObjectId::parse_str(id).ok())
            .collect();

        Ok(reviews
            .find_many(doc! { "_id": { "$in": review_oids } })
            .await?
            .into_iter()
            .map(ReviewResponse::from)
            .collect())
    }
    .await;

    match result {
        Ok(list) => data_response(
            StatusCode::OK,
            "Reviews found",
            serde_json::to_value(&list).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_user_reviews(
    _req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    user_id: &str,
) -> Response<BoxBody> {
    let result: Result<Vec<ReviewResponse>> = async {
        let mongo = require_mongo(&state)?;
        let reviews = mongo
            .collection::<ReviewDoc>(REVIEW_COLLECTION)
            .await?;

        Ok(reviews
            .find_many(doc! { "author_id": user_id })
            .await?
            .into_iter()
            .map(ReviewResponse::from)
            .collect())
    }
    .await;

    match result {
        Ok(list) => data_response(
            StatusCode::OK,
            "Reviews found",
            serde_json::to_value(&list).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}
