//! HTTP routes for Bazaar
//!
//! Each module owns one route prefix and exposes a `handle_*_request`
//! dispatcher returning `None` when the path is not its concern. Shared
//! response/auth helpers live here.

pub mod buyers;
pub mod comments;
pub mod health;
pub mod products;
pub mod reviews;
pub mod sellers;

pub use buyers::handle_buyer_request;
pub use comments::handle_comment_request;
pub use health::{health_check, readiness_check, version_info};
pub use products::handle_product_request;
pub use reviews::handle_review_request;
pub use sellers::handle_seller_request;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_token_from_header, Claims};
use crate::db::mongo::MongoClient;
use crate::server::AppState;
use crate::types::ApiError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Response envelope shared by all endpoints: status code echoed in the
/// body, a human-readable message, and optional payload/token.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

pub fn message_response(status: StatusCode, message: impl Into<String>) -> Response<BoxBody> {
    json_response(
        status,
        &Envelope {
            status: status.as_u16(),
            message: message.into(),
            data: None,
            token: None,
        },
    )
}

pub fn data_response(
    status: StatusCode,
    message: impl Into<String>,
    data: serde_json::Value,
) -> Response<BoxBody> {
    json_response(
        status,
        &Envelope {
            status: status.as_u16(),
            message: message.into(),
            data: Some(data),
            token: None,
        },
    )
}

pub fn error_response(err: &ApiError) -> Response<BoxBody> {
    message_response(err.status(), err.to_string())
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, ApiError> {
    let body = req
        .collect()
        .await
        .map_err(|e| ApiError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > 10240 {
        return Err(ApiError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes).map_err(|e| ApiError::Http(format!("Invalid JSON: {}", e)))
}

pub fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Verify the bearer token and return its claims
pub fn authenticate(
    req: &Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<Claims, ApiError> {
    let token = extract_token_from_header(get_auth_header(req))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;
    state.jwt.verify(token)
}

/// Seller-only routes additionally require the `can_sell` marker
pub fn require_seller(claims: &Claims) -> Result<(), ApiError> {
    if !claims.can_sell {
        return Err(ApiError::Forbidden("Seller account required".into()));
    }
    Ok(())
}

/// MongoDB-backed routes return 503 when running dev mode without a database
pub fn require_mongo(state: &AppState) -> Result<MongoClient, ApiError> {
    state
        .mongo
        .clone()
        .ok_or_else(|| ApiError::Unavailable("MongoDB is not connected".into()))
}

/// Parse a path parameter as a MongoDB ObjectId
pub fn parse_oid(id: &str) -> Result<bson::oid::ObjectId, ApiError> {
    bson::oid::ObjectId::parse_str(id)
        .map_err(|_| ApiError::Validation(format!("Invalid id: {}", id)))
}

/// Split a path into its non-empty segments, query string stripped
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('?')
        .next()
        .unwrap_or(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a single query parameter, if present
pub fn query_param<'a>(req: &'a Request<hyper::body::Incoming>, name: &str) -> Option<&'a str> {
    req.uri().query().and_then(|q| {
        q.split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    })
}

/// Shared handler for the vote routes of both votable kinds
pub async fn engagement_vote(
    req: Request<hyper::body::Incoming>,
    state: std::sync::Arc<AppState>,
    kind: crate::engagement::VotableKind,
    id: &str,
    vote: crate::engagement::VoteKind,
    cast: bool,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result = if cast {
        state.engagement.set_vote(&claims.sub, kind, id, vote).await
    } else {
        state.engagement.clear_vote(&claims.sub, kind, id, vote).await
    };

    match result {
        Ok(()) => {
            let message = match (cast, vote) {
                (true, crate::engagement::VoteKind::Like) => {
                    format!("{} liked", kind.noun_capitalized())
                }
                (true, crate::engagement::VoteKind::Dislike) => {
                    format!("{} disliked", kind.noun_capitalized())
                }
                (false, crate::engagement::VoteKind::Like) => "Like removed".to_string(),
                (false, crate::engagement::VoteKind::Dislike) => "Dislike removed".to_string(),
            };
            message_response(StatusCode::OK, message)
        }
        Err(e) => error_response(&e),
    }
}

/// Shared handler for the save/unsave routes of both votable kinds
pub async fn engagement_save(
    req: Request<hyper::body::Incoming>,
    state: std::sync::Arc<AppState>,
    kind: crate::engagement::VotableKind,
    id: &str,
    save: bool,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result = if save {
        state.engagement.save(&claims.sub, kind, id).await
    } else {
        state.engagement.unsave(&claims.sub, kind, id).await
    };

    match result {
        Ok(()) => {
            let message = if save {
                format!("{} saved", kind.noun_capitalized())
            } else {
                format!("{} removed from saved", kind.noun_capitalized())
            };
            message_response(StatusCode::OK, message)
        }
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("/comment/like/abc"), vec!["comment", "like", "abc"]);
        assert_eq!(path_segments("/comment/like/abc?x=1"), vec!["comment", "like", "abc"]);
        assert_eq!(path_segments("/"), Vec::<&str>::new());
    }
}
