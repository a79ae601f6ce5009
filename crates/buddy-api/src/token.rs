//! JWT issuance and verification.
//!
//! Tokens carry a snapshot of the user's role and flags. Handlers trust the
//! claims until the token expires; a user deactivated after login keeps the
//! old privileges for at most one token lifetime.

use std::time::Duration;

use buddy_db::models::UserRow;
use buddy_types::api::Claims;
use buddy_types::models::Role;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::config::TokenConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("authorization scheme is not Bearer")]
    InvalidAuthMethod,

    #[error("invalid token")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Encoding(String),
}

/// HS256 signer and verifier built from [`TokenConfig`].
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration: Duration,
    admin_expiration: Duration,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            expiration: config.expiration,
            admin_expiration: config.admin_expiration,
        }
    }

    /// Sign a token for `user`. The caller decides whether the user may get
    /// an admin token.
    pub fn issue(&self, user: &UserRow, as_admin: bool) -> Result<String, TokenError> {
        self.issue_at(user, as_admin, now_secs())
    }

    pub fn issue_at(&self, user: &UserRow, as_admin: bool, now: u64) -> Result<String, TokenError> {
        let lifetime = if as_admin {
            self.admin_expiration
        } else {
            self.expiration
        };

        let claims = Claims {
            username: user.username.clone(),
            verified: user.email.is_some(),
            role: user.role,
            active: (user.role == Role::Buddy).then_some(user.active),
            admin: as_admin.then_some(true),
            iat: now as usize,
            exp: (now + lifetime.as_secs()) as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify an `Authorization` header value of the form `Bearer <token>`.
    pub fn verify(&self, header: &str) -> Result<Claims, TokenError> {
        self.verify_at(header, now_secs())
    }

    pub fn verify_at(&self, header: &str, now: u64) -> Result<Claims, TokenError> {
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(TokenError::InvalidAuthMethod)?;

        // Expiry is checked below so that a token is dead from `exp` on.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token.trim(), &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidSignature,
            }
        })?;

        if data.claims.exp as u64 <= now {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
