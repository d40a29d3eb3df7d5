//! HTTP routes for buyer accounts
//!
//! - POST   /user/register - create a buyer account, returns a JWT
//! - POST   /user/login    - authenticate, returns a JWT
//! - GET    /user/me       - current profile from the token
//! - PUT    /user/edit     - field-wise profile update
//! - DELETE /user/delete   - delete the account
//!
//! The plural prefix /users/* is accepted as an alias.

use bson::{doc, DateTime};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::{BuyerDoc, BUYER_COLLECTION};
use crate::routes::{
    authenticate, cors_preflight, error_response, json_response, message_response,
    parse_json_body, parse_oid, path_segments, require_mongo, BoxBody, Envelope,
};
use crate::server::AppState;
use crate::types::{ApiError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBuyerRequest {
    pub name: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile_img: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBuyerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_img: Option<String>,
    #[serde(default)]
    pub old_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerProfile {
    pub id: String,
    pub name: String,
    pub user_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_img: Option<String>,
    pub liked_comments: Vec<String>,
    pub disliked_comments: Vec<String>,
    pub saved_comments: Vec<String>,
    pub liked_reviews: Vec<String>,
    pub disliked_reviews: Vec<String>,
    pub saved_reviews: Vec<String>,
    pub wishlist: Vec<String>,
}

impl From<BuyerDoc> for BuyerProfile {
    fn from(doc: BuyerDoc) -> Self {
        Self {
            id: doc._id.map(|o| o.to_hex()).unwrap_or_default(),
            name: doc.name,
            user_name: doc.user_name,
            email: doc.email,
            profile_img: doc.profile_img,
            liked_comments: doc.liked_comments,
            disliked_comments: doc.disliked_comments,
            saved_comments: doc.saved_comments,
            liked_reviews: doc.liked_reviews,
            disliked_reviews: doc.disliked_reviews,
            saved_reviews: doc.saved_reviews,
            wishlist: doc.wishlist,
        }
    }
}

pub async fn handle_buyer_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let segments = path_segments(&path);

    if segments.first() != Some(&"user") && segments.first() != Some(&"users") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let method = req.method().clone();
    let rest: Vec<String> = segments[1..].iter().map(|s| s.to_string()).collect();
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

    let response = match (&method, rest.as_slice()) {
        (&Method::POST, ["register"]) => handle_register(req, state).await,
        (&Method::POST, ["login"]) => handle_login(req, state).await,
        (&Method::GET, ["me"]) => handle_me(req, state).await,
        (&Method::PUT, ["edit"]) => handle_edit(req, state).await,
        (&Method::DELETE, ["delete"]) => handle_delete(req, state).await,
        _ => message_response(StatusCode::NOT_FOUND, "User endpoint not found"),
    };

    Some(response)
}

fn validate_registration(body: &RegisterBuyerRequest) -> Result<()> {
    if body.name.trim().is_empty() || body.user_name.trim().is_empty() {
        return Err(ApiError::Validation("Name and username are required".into()));
    }
    if !body.email.contains('@') {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    if body.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: RegisterBuyerRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result: Result<(BuyerProfile, String)> = async {
        validate_registration(&body)?;

        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;

        if buyers
            .find_one(doc! { "email": &body.email })
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict("Email already in use".into()));
        }
        if buyers
            .find_one(doc! { "user_name": &body.user_name })
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict("Username already taken".into()));
        }

        let password_hash = hash_password(&body.password)?;
        let mut buyer = BuyerDoc::new(
            body.name.trim().to_string(),
            body.user_name.trim().to_string(),
            body.email.trim().to_string(),
            password_hash,
            body.profile_img.clone(),
        );
        let oid = buyers.insert_one(buyer.clone()).await?;
        buyer._id = Some(oid);

        let (token, _) = state
            .jwt
            .issue(&oid.to_hex(), &buyer.name, &buyer.email, false)?;

        info!(buyer_id = %oid.to_hex(), "buyer registered");
        Ok((BuyerProfile::from(buyer), token))
    }
    .await;

    match result {
        Ok((profile, token)) => json_response(
            StatusCode::CREATED,
            &Envelope {
                status: StatusCode::CREATED.as_u16(),
                message: "Account created".into(),
                data: serde_json::to_value(&profile).ok(),
                token: Some(token),
            },
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result: Result<(BuyerProfile, String)> = async {
        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;

        let buyer = buyers
            .find_one(doc! { "email": &body.email })
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        if !verify_password(&body.password, &buyer.password_hash)? {
            return Err(ApiError::Unauthorized("Incorrect password".into()));
        }

        let id = buyer._id.map(|o| o.to_hex()).unwrap_or_default();
        let (token, _) = state.jwt.issue(&id, &buyer.name, &buyer.email, false)?;
        Ok((BuyerProfile::from(buyer), token))
    }
    .await;

    match result {
        Ok((profile, token)) => json_response(
            StatusCode::OK,
            &Envelope {
                status: StatusCode::OK.as_u16(),
                message: "Logged in".into(),
                data: serde_json::to_value(&profile).ok(),
                token: Some(token),
            },
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_me(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result: Result<BuyerProfile> = async {
        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
        let oid = parse_oid(&claims.sub)?;

        buyers
            .find_one(doc! { "_id": oid })
            .await?
            .map(BuyerProfile::from)
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }
    .await;

    match result {
        Ok(profile) => json_response(
            StatusCode::OK,
            &Envelope {
                status: StatusCode::OK.as_u16(),
                message: "Profile found".into(),
                data: serde_json::to_value(&profile).ok(),
                token: None,
            },
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_edit(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let body: EditBuyerRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
        let oid = parse_oid(&claims.sub)?;

        let buyer = buyers
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        let mut set = doc! { "metadata.updated_at": DateTime::now() };

        if let Some(name) = &body.name {
            if name.trim().is_empty() {
                return Err(ApiError::Validation("Name cannot be empty".into()));
            }
            set.insert("name", name.trim());
        }

        if let Some(user_name) = &body.user_name {
            if user_name.trim().is_empty() {
                return Err(ApiError::Validation("Username cannot be empty".into()));
            }
            if buyers
                .find_one(doc! { "user_name": user_name.trim(), "_id": { "$ne": oid } })
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict("Username already taken".into()));
            }
            set.insert("user_name", user_name.trim());
        }

        if let Some(email) = &body.email {
            if !email.contains('@') {
                return Err(ApiError::Validation("Invalid email address".into()));
            }
            if buyers
                .find_one(doc! { "email": email.trim(), "_id": { "$ne": oid } })
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict("Email already in use".into()));
            }
            set.insert("email", email.trim());
        }

        if let Some(img) = &body.profile_img {
            set.insert("profile_img", img.as_str());
        }

        if let Some(new_password) = &body.new_password {
            let old_password = body
                .old_password
                .as_deref()
                .ok_or_else(|| ApiError::Validation("Old password is required".into()))?;
            if !verify_password(old_password, &buyer.password_hash)? {
                return Err(ApiError::Unauthorized("Incorrect password".into()));
            }
            if new_password == old_password {
                return Err(ApiError::Unprocessable(
                    "New password must be different from the old password".into(),
                ));
            }
            if new_password.len() < 8 {
                return Err(ApiError::Validation(
                    "Password must be at least 8 characters".into(),
                ));
            }
            set.insert("password_hash", hash_password(new_password)?);
        }

        buyers
            .update_one(doc! { "_id": oid }, doc! { "$set": set })
            .await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Profile updated"),
        Err(e) => error_response(&e),
    }
}

async fn handle_delete(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
        let oid = parse_oid(&claims.sub)?;

        let deleted = buyers.soft_delete(doc! { "_id": oid }).await?;
        if deleted.matched_count == 0 {
            return Err(ApiError::NotFound("User not found".into()));
        }
        info!(buyer_id = %claims.sub, "buyer account deleted");
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Account deleted"),
        Err(e) => error_response(&e),
    }
}
