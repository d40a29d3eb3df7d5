//! Configuration for Bazaar
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Bazaar - REST backend for the Bazaar e-commerce platform
#[derive(Parser, Debug, Clone)]
#[command(name = "bazaar")]
#[command(about = "REST backend for buyers, sellers, products, reviews and comments")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "bazaar")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "86400")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (in-memory engagement store when MongoDB is
    /// unreachable, insecure default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_secret_in_production() {
        let args = Args::parse_from(["bazaar"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_dev_mode_without_secret() {
        let args = Args::parse_from(["bazaar", "--dev-mode"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.jwt_secret(), "dev-only-insecure-secret");
    }

    #[test]
    fn test_validate_rejects_zero_expiry() {
        let mut args = Args::parse_from(["bazaar", "--jwt-secret", "test-secret"]);
        args.jwt_expiry_seconds = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_explicit_secret_wins_in_dev_mode() {
        let args = Args::parse_from(["bazaar", "--dev-mode", "--jwt-secret", "s3cret"]);
        assert_eq!(args.jwt_secret(), "s3cret");
    }
}
