//! HTTP routes for comments
//!
//! - POST   /comment/reply        - reply under a review or another comment
//! - GET    /comment/:id          - fetch one comment
//! - GET    /comment/replies/:id  - fetch a comment's replies, dangling ids skipped
//! - PUT    /comment/edit         - edit own comment text
//! - DELETE /comment/delete/:id   - delete own comment
//! - POST/DELETE /comment/like/:id, /comment/dislike/:id - vote and retract
//! - POST/DELETE /comment/save/:id - bookmark and unbookmark
//!
//! The plural prefix /comments/* is accepted as an alias.

use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::engagement::{VotableKind, VoteKind};
use crate::routes::{
    authenticate, cors_preflight, data_response, engagement_save, engagement_vote, error_response,
    message_response, parse_json_body, path_segments, BoxBody,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    #[serde(default)]
    pub review_id: Option<String>,
    #[serde(default)]
    pub parent_comment_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommentRequest {
    pub comment_id: String,
    pub text: String,
}

pub async fn handle_comment_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let segments = path_segments(&path);

    if segments.first() != Some(&"comment") && segments.first() != Some(&"comments") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let method = req.method().clone();
    let rest: Vec<String> = segments[1..].iter().map(|s| s.to_string()).collect();
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

    let response = match (&method, rest.as_slice()) {
        (&Method::POST, ["reply"]) => handle_reply(req, state).await,
        (&Method::GET, ["replies", id]) => handle_get_replies(req, state, id).await,
        (&Method::PUT, ["edit"]) => handle_edit(req, state).await,
        (&Method::DELETE, ["delete", id]) => handle_delete(req, state, id).await,

        (&Method::POST, ["like", id]) => {
            engagement_vote(req, state, VotableKind::Comment, id, VoteKind::Like, true).await
        }
        (&Method::DELETE, ["like", id]) => {
            engagement_vote(req, state, VotableKind::Comment, id, VoteKind::Like, false).await
        }
        (&Method::POST, ["dislike", id]) => {
            engagement_vote(req, state, VotableKind::Comment, id, VoteKind::Dislike, true).await
        }
        (&Method::DELETE, ["dislike", id]) => {
            engagement_vote(req, state, VotableKind::Comment, id, VoteKind::Dislike, false).await
        }
        (&Method::POST, ["save", id]) => {
            engagement_save(req, state, VotableKind::Comment, id, true).await
        }
        (&Method::DELETE, ["save", id]) => {
            engagement_save(req, state, VotableKind::Comment, id, false).await
        }

        (&Method::GET, [id]) => handle_get(req, state, id).await,

        _ => message_response(StatusCode::NOT_FOUND, "Comment endpoint not found"),
    };

    Some(response)
}

async fn handle_reply(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let body: ReplyRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state
        .engagement
        .post_reply(
            &claims.sub,
            &claims.name,
            &body.text,
            body.review_id,
            body.parent_comment_id,
        )
        .await
    {
        Ok(node) => data_response(
            StatusCode::CREATED,
            "Comment posted",
            serde_json::to_value(&node).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_get(
    _req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    match state.engagement.get_comment(id).await {
        Ok(node) => data_response(
            StatusCode::OK,
            "Comment found",
            serde_json::to_value(&node).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_get_replies(
    _req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    match state.engagement.get_replies(id).await {
        Ok(nodes) => data_response(
            StatusCode::OK,
            "Replies found",
            serde_json::to_value(&nodes).unwrap_or_default(),
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

    let body: EditCommentRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    match state
        .engagement
        .edit_comment(&claims.sub, &body.comment_id, &body.text)
        .await
    {
        Ok(()) => message_response(StatusCode::OK, "Comment updated"),
        Err(e) => error_response(&e),
    }
}

async fn handle_delete(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match state.engagement.delete_comment(&claims.sub, id).await {
        Ok(()) => message_response(StatusCode::OK, "Comment deleted"),
        Err(e) => error_response(&e),
    }
}
