//! JWT token issuance and validation
//!
//! Tokens carry the actor identity (buyer or seller) as verified claims.
//! Sellers are distinguished by the `can_sell` marker; seller-only routes
//! reject tokens without it.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::ApiError;

/// Verified token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Actor document id (buyer or seller)
    pub sub: String,
    /// Display name snapshot, denormalized into authored content
    pub name: String,
    /// Account email
    pub email: String,
    /// Seller capability marker
    #[serde(default)]
    pub can_sell: bool,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Issues and verifies HS256 tokens with a shared secret
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Issue a token for an authenticated actor. Returns the token and its
    /// expiry timestamp.
    pub fn issue(
        &self,
        actor_id: &str,
        name: &str,
        email: &str,
        can_sell: bool,
    ) -> Result<(String, u64), ApiError> {
        let now = unix_now();
        let claims = Claims {
            sub: actor_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            can_sell,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Database(format!("Failed to sign token: {e}")))?;

        Ok((token, claims.exp))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid or expired token: {e}")))
    }
}

/// Extract a bearer token from an Authorization header value.
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header.and_then(|h| h.strip_prefix("Bearer ")).map(str::trim)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let jwt = JwtValidator::new("test-secret", 3600);
        let (token, exp) = jwt.issue("buyer-1", "Ada", "ada@example.com", false).unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, "buyer-1");
        assert_eq!(claims.name, "Ada");
        assert!(!claims.can_sell);
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn test_seller_marker_survives_roundtrip() {
        let jwt = JwtValidator::new("test-secret", 3600);
        let (token, _) = jwt.issue("seller-1", "Shop", "shop@example.com", true).unwrap();
        assert!(jwt.verify(&token).unwrap().can_sell);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = JwtValidator::new("secret-a", 3600);
        let (token, _) = jwt.issue("buyer-1", "Ada", "ada@example.com", false).unwrap();

        let other = JwtValidator::new("secret-b", 3600);
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("abc.def.ghi")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
