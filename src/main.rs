//! Bazaar - REST backend for an e-commerce platform

use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar::{
    auth::JwtValidator,
    config::Args,
    db::schemas::{BUYER_COLLECTION, COMMENT_COLLECTION, REVIEW_COLLECTION},
    db::MongoClient,
    engagement::{Engagement, EngagementStore, MemoryEngagementStore, MongoEngagementStore},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("bazaar={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Bazaar - e-commerce REST backend");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, continuing without): {}",
                    e
                );
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Engagement store: MongoDB-backed in production, in-memory in dev mode
    let store: Arc<dyn EngagementStore> = match &mongo {
        Some(client) => {
            let buyers = client.collection(BUYER_COLLECTION).await?;
            let comments = client.collection(COMMENT_COLLECTION).await?;
            let reviews = client.collection(REVIEW_COLLECTION).await?;
            Arc::new(MongoEngagementStore::new(buyers, comments, reviews))
        }
        None => {
            warn!("Using in-memory engagement store (data is not persisted)");
            Arc::new(MemoryEngagementStore::new())
        }
    };

    let jwt = Arc::new(JwtValidator::new(
        &args.jwt_secret(),
        args.jwt_expiry_seconds,
    ));

    let state = Arc::new(AppState {
        engagement: Engagement::new(store),
        mongo,
        jwt,
        started_at: Instant::now(),
        args,
    });

    server::run(state).await?;
    Ok(())
}
