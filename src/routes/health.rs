//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - liveness (is the service running?)
//! - /ready, /readyz   - readiness (can it serve traffic? MongoDB reachable,
//!                       unless dev mode runs on the in-memory store)
//! - /version          - build information for deployment verification

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    pub mode: String,
    pub node_id: String,
    pub mongo_connected: bool,
    pub uptime_seconds: u64,
    pub timestamp: String,
}

fn build_health_response(state: &AppState, mongo_ok: bool) -> HealthResponse {
    let args = &state.args;

    let status = if mongo_ok || args.dev_mode {
        "online"
    } else {
        "degraded"
    };

    HealthResponse {
        healthy: true,
        status,
        version: env!("CARGO_PKG_VERSION"),
        mode: if args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: args.node_id.to_string(),
        mongo_connected: mongo_ok,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Liveness probe: 200 whenever the process is serving
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    let response = build_health_response(&state, state.mongo.is_some());
    json_response(StatusCode::OK, &response)
}

/// Readiness probe: 200 only when the storage backend is reachable. Dev
/// mode is always ready (in-memory engagement store).
pub async fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    let mongo_ok = match &state.mongo {
        Some(mongo) => mongo.ping().await.is_ok(),
        None => false,
    };

    let is_ready = mongo_ok || state.args.dev_mode;
    let response = build_health_response(&state, mongo_ok);

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, &response)
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Build information for deployment verification
pub fn version_info() -> Response<BoxBody> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "bazaar",
    };
    json_response(StatusCode::OK, &response)
}
