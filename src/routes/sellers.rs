//! HTTP routes for seller accounts
//!
//! Mirrors the buyer account surface; tokens issued here carry the
//! `can_sell` capability that the product mutation routes require.
//!
//! - POST   /seller/register
//! - POST   /seller/login
//! - GET    /seller/me
//! - PUT    /seller/edit
//! - DELETE /seller/delete
//!
//! The plural prefix /sellers/* is accepted as an alias.

use bson::{doc, DateTime};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::{SellerDoc, SELLER_COLLECTION};
use crate::routes::{
    authenticate, cors_preflight, error_response, json_response, message_response,
    parse_json_body, parse_oid, path_segments, require_mongo, require_seller, BoxBody, Envelope,
};
use crate::server::AppState;
use crate::types::{ApiError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSellerRequest {
    pub name: String,
    pub seller_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub about: Option<String>,
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
pub struct EditSellerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub seller_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub profile_img: Option<String>,
    #[serde(default)]
    pub old_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
    pub id: String,
    pub name: String,
    pub seller_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_img: Option<String>,
}

impl From<SellerDoc> for SellerProfile {
    fn from(doc: SellerDoc) -> Self {
        Self {
            id: doc._id.map(|o| o.to_hex()).unwrap_or_default(),
            name: doc.name,
            seller_name: doc.seller_name,
            email: doc.email,
            about: doc.about,
            profile_img: doc.profile_img,
        }
    }
}

pub async fn handle_seller_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let segments = path_segments(&path);

    if segments.first() != Some(&"seller") && segments.first() != Some(&"sellers") {
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
        _ => message_response(StatusCode::NOT_FOUND, "Seller endpoint not found"),
    };

    Some(response)
}

async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: RegisterSellerRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result: Result<(SellerProfile, String)> = async {
        if body.name.trim().is_empty() || body.seller_name.trim().is_empty() {
            return Err(ApiError::Validation(
                "Name and seller name are required".into(),
            ));
        }
        if !body.email.contains('@') {
            return Err(ApiError::Validation("Invalid email address".into()));
        }
        if body.password.len() < 8 {
            return Err(ApiError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }

        let mongo = require_mongo(&state)?;
        let sellers = mongo.collection::<SellerDoc>(SELLER_COLLECTION).await?;

        if sellers
            .find_one(doc! { "email": &body.email })
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict("Email already in use".into()));
        }
        if sellers
            .find_one(doc! { "seller_name": &body.seller_name })
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict("Seller name already taken".into()));
        }

        let password_hash = hash_password(&body.password)?;
        let mut seller = SellerDoc::new(
            body.name.trim().to_string(),
            body.seller_name.trim().to_string(),
            body.email.trim().to_string(),
            password_hash,
            body.about.clone(),
            body.profile_img.clone(),
        );
        let oid = sellers.insert_one(seller.clone()).await?;
        seller._id = Some(oid);

        let (token, _) = state
            .jwt
            .issue(&oid.to_hex(), &seller.name, &seller.email, true)?;

        info!(seller_id = %oid.to_hex(), "seller registered");
        Ok((SellerProfile::from(seller), token))
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

    let result: Result<(SellerProfile, String)> = async {
        let mongo = require_mongo(&state)?;
        let sellers = mongo.collection::<SellerDoc>(SELLER_COLLECTION).await?;

        let seller = sellers
            .find_one(doc! { "email": &body.email })
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        if !verify_password(&body.password, &seller.password_hash)? {
            return Err(ApiError::Unauthorized("Incorrect password".into()));
        }

        let id = seller._id.map(|o| o.to_hex()).unwrap_or_default();
        let (token, _) = state.jwt.issue(&id, &seller.name, &seller.email, true)?;
        Ok((SellerProfile::from(seller), token))
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
    if let Err(e) = require_seller(&claims) {
        return error_response(&e);
    }

    let result: Result<SellerProfile> = async {
        let mongo = require_mongo(&state)?;
        let sellers = mongo.collection::<SellerDoc>(SELLER_COLLECTION).await?;
        let oid = parse_oid(&claims.sub)?;

        sellers
            .find_one(doc! { "_id": oid })
            .await?
            .map(SellerProfile::from)
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
    if let Err(e) = require_seller(&claims) {
        return error_response(&e);
    }

    let body: EditSellerRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let sellers = mongo.collection::<SellerDoc>(SELLER_COLLECTION).await?;
        let oid = parse_oid(&claims.sub)?;

        let seller = sellers
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

        if let Some(seller_name) = &body.seller_name {
            if seller_name.trim().is_empty() {
                return Err(ApiError::Validation("Seller name cannot be empty".into()));
            }
            if sellers
                .find_one(doc! { "seller_name": seller_name.trim(), "_id": { "$ne": oid } })
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict("Seller name already taken".into()));
            }
            set.insert("seller_name", seller_name.trim());
        }

        if let Some(email) = &body.email {
            if !email.contains('@') {
                return Err(ApiError::Validation("Invalid email address".into()));
            }
            if sellers
                .find_one(doc! { "email": email.trim(), "_id": { "$ne": oid } })
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict("Email already in use".into()));
            }
            set.insert("email", email.trim());
        }

        if let Some(about) = &body.about {
            set.insert("about", about.as_str());
        }
        if let Some(img) = &body.profile_img {
            set.insert("profile_img", img.as_str());
        }

        if let Some(new_password) = &body.new_password {
            let old_password = body
                .old_password
                .as_deref()
                .ok_or_else(|| ApiError::Validation("Old password is required".into()))?;
            if !verify_password(old_password, &seller.password_hash)? {
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

        sellers
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
    if let Err(e) = require_seller(&claims) {
        return error_response(&e);
    }

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let sellers = mongo.collection::<SellerDoc>(SELLER_COLLECTION).await?;
        let oid = parse_oid(&claims.sub)?;

        let deleted = sellers.soft_delete(doc! { "_id": oid }).await?;
        if deleted.matched_count == 0 {
            return Err(ApiError::NotFound("User not found".into()));
        }
        info!(seller_id = %claims.sub, "seller account deleted");
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Account deleted"),
        Err(e) => error_response(&e),
    }
}
