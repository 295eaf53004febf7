//! Bearer tokens and password-reset tokens
//!
//! Session tokens are HS256 JWTs carrying the user id and role. Reset
//! tokens are random hex strings; only their SHA-256 digest is stored.

use anyhow::{Context, Result};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{Duration, Utc};
use data_encoding::HEXLOWER;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;
use crate::models::{User, UserRole};

/// Random bytes in a reset token before hex encoding
pub const RESET_TOKEN_BYTES: usize = 20;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expire_days: i64,
}

impl TokenService {
    pub fn new(secret: &str, expire_days: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expire_days: expire_days.max(1),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expire_days)
    }

    /// Sign a token for the user
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::days(self.expire_days)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).context("Failed to sign token")
    }

    /// Validate signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).context("Invalid token")?;
        Ok(data.claims)
    }
}

/// Fresh reset token: the plain value to mail and the digest to store
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let token = HEXLOWER.encode(&bytes);
    let digest = hash_reset_token(&token);
    (token, digest)
}

/// SHA-256 hex digest of a reset token
pub fn hash_reset_token(token: &str) -> String {
    HEXLOWER.encode(&Sha256::digest(token.as_bytes()))
}
