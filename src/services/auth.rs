//! Staff authentication: password hashing and the bearer tokens handed out
//! by the admin and delivery login endpoints.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;

use crate::errors::ApiError;
use crate::Result;

const SALT_LEN: usize = 16;

/// Whose token it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Delivery,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Delivery => f.write_str("delivery"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Row id of the admin or delivery agent
    pub sub: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha3_256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Returns `salt_hex$digest_hex`
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!("{}${}", hex::encode(salt), hex::encode(digest(&salt, password)))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };
    let actual = digest(&salt, password);
    if actual.len() != expected.len() {
        return false;
    }
    // Compare every byte so timing does not reveal the matching prefix
    actual
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Issues and validates HS256 tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, subject: i32, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            ApiError::Custom("Failed to sign token".to_string())
        })
    }

    /// Decodes the token and checks it was issued for `role`
    pub fn validate(&self, token: &str, role: Role) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        if data.claims.role != role {
            return Err(ApiError::Forbidden(format!(
                "This endpoint requires a {role} token"
            )));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
        // Salted: the same password hashes differently each time
        assert_ne!(stored, hash_password("hunter22"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "nodollar"));
        assert!(!verify_password("x", "zz$zz"));
        assert!(!verify_password("x", "00$00"));
    }

    #[test]
    fn test_token_round_trip() {
        let issuer = TokenIssuer::new("secret", 1);
        let token = issuer.issue(42, Role::Delivery).unwrap();
        let claims = issuer.validate(&token, Role::Delivery).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Delivery);
    }

    #[test]
    fn test_wrong_role_is_forbidden() {
        let issuer = TokenIssuer::new("secret", 1);
        let token = issuer.issue(1, Role::Delivery).unwrap();
        assert!(matches!(
            issuer.validate(&token, Role::Admin),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_expired_and_foreign_tokens_are_rejected() {
        let expired = TokenIssuer::new("secret", -1);
        let token = expired.issue(1, Role::Admin).unwrap();
        assert!(matches!(
            expired.validate(&token, Role::Admin),
            Err(ApiError::Unauthorized(_))
        ));

        let other = TokenIssuer::new("other-secret", 1);
        let token = other.issue(1, Role::Admin).unwrap();
        let issuer = TokenIssuer::new("secret", 1);
        assert!(matches!(
            issuer.validate(&token, Role::Admin),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            issuer.validate("garbage", Role::Admin),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
