//! HTTP server and top-level request dispatch
//!
//! hyper 1.x with manual routing: each route module gets a chance to claim
//! the request by prefix and returns `None` otherwise.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::mongo::MongoClient;
use crate::engagement::Engagement;
use crate::routes::{
    self, cors_preflight, handle_buyer_request, handle_comment_request, handle_product_request,
    handle_review_request, handle_seller_request, message_response, BoxBody,
};
use crate::types::Result;

/// Shared state for all request handlers
pub struct AppState {
    pub args: Args,
    /// Absent when dev mode runs without a reachable MongoDB
    pub mongo: Option<MongoClient>,
    pub engagement: Engagement,
    pub jwt: Arc<JwtValidator>,
    pub started_at: Instant,
}

/// Bind the listen address and serve until the process exits
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Listening on http://{}", state.args.listen);

    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!("Accept failed: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Connection from {} ended: {}", remote, e);
            }
        });
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("{} {}", method, path);

    // Probes first, no auth
    match (&method, path.as_str()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return Ok(routes::health_check(state.clone()))
        }
        (&Method::GET, "/ready") | (&Method::GET, "/readyz") => {
            return Ok(routes::readiness_check(state.clone()).await)
        }
        (&Method::GET, "/version") => return Ok(routes::version_info()),
        _ => {}
    }

    // Dispatch by route prefix; each module owns one prefix
    let prefix = path.trim_start_matches('/').split('/').next().unwrap_or("");
    let response = match prefix {
        "user" | "users" => handle_buyer_request(req, state).await,
        "seller" | "sellers" => handle_seller_request(req, state).await,
        "comment" | "comments" => handle_comment_request(req, state).await,
        "review" | "reviews" => handle_review_request(req, state).await,
        "product" | "products" => handle_product_request(req, state).await,
        _ => {
            if method == Method::OPTIONS {
                Some(cors_preflight())
            } else {
                None
            }
        }
    };

    Ok(response
        .unwrap_or_else(|| message_response(StatusCode::NOT_FOUND, "Endpoint not found")))
}
